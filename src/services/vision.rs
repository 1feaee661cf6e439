//! Image classification (Watson Visual Recognition v3).

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::RelayError;
use crate::http_client::ExternalService;

const CLASSIFY_URL: &str = "https://gateway-a.watsonplatform.net/visual-recognition/api/v3/classify";
const API_VERSION_DATE: &str = "2016-05-20";

#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Labels for the image at `image_url`, best match first
    async fn classify(&self, image_url: &str) -> Result<Vec<String>, RelayError>;
}

/// Search text built from the two best labels, or `None` without any label
pub fn location_query(labels: &[String]) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    Some(labels.iter().take(2).map(String::as_str).collect::<Vec<_>>().join(" "))
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    images: Vec<ClassifiedImage>,
}

#[derive(Debug, Deserialize)]
struct ClassifiedImage {
    #[serde(default)]
    classifiers: Vec<Classifier>,
}

#[derive(Debug, Deserialize)]
struct Classifier {
    #[serde(default)]
    classes: Vec<ClassScore>,
}

#[derive(Debug, Deserialize)]
struct ClassScore {
    class: String,
    #[serde(default)]
    score: f64,
}

impl ClassifyResponse {
    fn ranked_labels(self) -> Vec<String> {
        let mut classes: Vec<ClassScore> = self
            .images
            .into_iter()
            .next()
            .and_then(|image| image.classifiers.into_iter().next())
            .map(|classifier| classifier.classes)
            .unwrap_or_default();
        // Stable sort keeps the service order for equal scores
        classes.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        classes.into_iter().map(|c| c.class).collect()
    }
}

#[derive(Debug)]
pub struct WatsonClassifier {
    service: ExternalService,
    api_key: String,
}

impl WatsonClassifier {
    pub fn new(service: ExternalService, api_key: &str) -> Self {
        Self {
            service,
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ImageClassifier for WatsonClassifier {
    async fn classify(&self, image_url: &str) -> Result<Vec<String>, RelayError> {
        let request = self.service.http().get(CLASSIFY_URL).query(&[
            ("api_key", self.api_key.as_str()),
            ("url", image_url),
            ("version", API_VERSION_DATE),
        ]);
        let body: ClassifyResponse = self.service.json(request).await?;
        Ok(body.ranked_labels())
    }
}

//! GIF lookup (Giphy translate endpoint).

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::RelayError;
use crate::http_client::ExternalService;

const TRANSLATE_URL: &str = "https://api.giphy.com/v1/gifs/translate";

#[async_trait]
pub trait GifSearch: Send + Sync {
    /// URL of a GIF matching `text`
    async fn translate(&self, text: &str) -> Result<String, RelayError>;
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: GifData,
}

#[derive(Debug, Deserialize)]
struct GifData {
    images: GifImages,
}

#[derive(Debug, Deserialize)]
struct GifImages {
    original: GifRendition,
}

#[derive(Debug, Deserialize)]
struct GifRendition {
    url: String,
}

#[derive(Debug)]
pub struct GiphyClient {
    service: ExternalService,
    api_key: String,
}

impl GiphyClient {
    pub fn new(service: ExternalService, api_key: &str) -> Self {
        Self {
            service,
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl GifSearch for GiphyClient {
    async fn translate(&self, text: &str) -> Result<String, RelayError> {
        let request = self
            .service
            .http()
            .get(TRANSLATE_URL)
            .query(&[("api_key", self.api_key.as_str()), ("s", text)]);
        let body: TranslateResponse = self.service.json(request).await?;
        Ok(body.data.images.original.url)
    }
}

//! Free-text address to coordinates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RelayError;
use crate::http_client::ExternalService;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const STATIC_MAP_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Static map image centred on this point
    pub fn static_map_url(&self) -> String {
        format!(
            "{STATIC_MAP_URL}?center={},{}&zoom=13&size=400x400",
            self.lat, self.lng
        )
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve an address; one call, no retry, no caching
    async fn resolve(&self, address: &str) -> Result<Coordinates, RelayError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
}

/// Google Geocoding API client
#[derive(Debug)]
pub struct GoogleGeocoder {
    service: ExternalService,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(service: ExternalService, api_key: &str) -> Self {
        Self {
            service,
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinates, RelayError> {
        let request = self
            .service
            .http()
            .get(GEOCODE_URL)
            .query(&[("address", address), ("key", self.api_key.as_str())]);
        let body: GeocodeResponse = self.service.json(request).await?;

        match body.status.as_str() {
            "OK" => body
                .results
                .into_iter()
                .next()
                .map(|r| r.geometry.location)
                .ok_or_else(|| RelayError::decode(self.service.name(), "no results")),
            "ZERO_RESULTS" => Err(RelayError::NotFound {
                what: format!("address '{address}'"),
            }),
            other => Err(RelayError::Status {
                service: self.service.name(),
                status: 200,
                detail: other.to_string(),
            }),
        }
    }
}

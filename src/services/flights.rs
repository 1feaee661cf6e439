//! Nearest-airport and low-fare lookups (Amadeus sandbox API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TravelDates;
use crate::errors::RelayError;
use crate::http_client::ExternalService;
use crate::services::geocoding::Coordinates;

const AMADEUS_BASE_URL: &str = "https://api.sandbox.amadeus.com/v1.2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub city: String,
}

/// One directional flight of a round trip
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlightLeg {
    pub departs_at: String,
    pub arrives_at: String,
    pub flight_number: String,
    #[serde(default)]
    pub aircraft: String,
}

/// Cheapest round trip found by the fare search
#[derive(Debug, Clone, PartialEq)]
pub struct FareQuote {
    pub outbound: FlightLeg,
    pub inbound: FlightLeg,
    /// Total fare exactly as the service reported it, e.g. `"345.60"`
    pub total_price: String,
    pub currency: String,
}

#[async_trait]
pub trait FlightSearch: Send + Sync {
    async fn nearest_airport(&self, point: Coordinates) -> Result<Airport, RelayError>;

    async fn low_fare_search(
        &self,
        origin: &Airport,
        destination: &Airport,
        dates: &TravelDates,
    ) -> Result<FareQuote, RelayError>;
}

#[derive(Debug, Deserialize)]
struct NearestAirport {
    airport: String,
    #[serde(default)]
    city_name: String,
}

#[derive(Debug, Deserialize)]
struct LowFareResponse {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    results: Vec<LowFareResult>,
}

#[derive(Debug, Deserialize)]
struct LowFareResult {
    itineraries: Vec<Itinerary>,
    fare: Fare,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    outbound: Bound,
    inbound: Bound,
}

#[derive(Debug, Deserialize)]
struct Bound {
    flights: Vec<FlightLeg>,
}

#[derive(Debug, Deserialize)]
struct Fare {
    total_price: String,
}

impl LowFareResponse {
    fn into_quote(self) -> Option<FareQuote> {
        let currency = self.currency.unwrap_or_else(|| "USD".to_string());
        let result = self.results.into_iter().next()?;
        let itinerary = result.itineraries.into_iter().next()?;
        Some(FareQuote {
            outbound: itinerary.outbound.flights.into_iter().next()?,
            inbound: itinerary.inbound.flights.into_iter().next()?,
            total_price: result.fare.total_price,
            currency,
        })
    }
}

#[derive(Debug)]
pub struct AmadeusClient {
    service: ExternalService,
    api_key: String,
}

impl AmadeusClient {
    pub fn new(service: ExternalService, api_key: &str) -> Self {
        Self {
            service,
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl FlightSearch for AmadeusClient {
    async fn nearest_airport(&self, point: Coordinates) -> Result<Airport, RelayError> {
        let request = self
            .service
            .http()
            .get(format!("{AMADEUS_BASE_URL}/airports/nearest-relevant"))
            .query(&[
                ("apikey", self.api_key.clone()),
                ("latitude", point.lat.to_string()),
                ("longitude", point.lng.to_string()),
            ]);
        let airports: Vec<NearestAirport> = self.service.json(request).await?;
        airports
            .into_iter()
            .next()
            .map(|a| Airport {
                code: a.airport,
                city: a.city_name,
            })
            .ok_or_else(|| RelayError::NotFound {
                what: format!("airport near {point}"),
            })
    }

    async fn low_fare_search(
        &self,
        origin: &Airport,
        destination: &Airport,
        dates: &TravelDates,
    ) -> Result<FareQuote, RelayError> {
        let request = self
            .service
            .http()
            .get(format!("{AMADEUS_BASE_URL}/flights/low-fare-search"))
            .query(&[
                ("apikey", self.api_key.clone()),
                ("origin", origin.code.clone()),
                ("destination", destination.code.clone()),
                ("departure_date", dates.departure.format("%Y-%m-%d").to_string()),
                ("return_date", dates.return_date.format("%Y-%m-%d").to_string()),
                ("nonstop", "true".to_string()),
                ("number_of_results", "1".to_string()),
            ]);
        let body: LowFareResponse = self.service.json(request).await?;
        body.into_quote().ok_or_else(|| RelayError::NotFound {
            what: format!("fare from {} to {}", origin.code, destination.code),
        })
    }
}

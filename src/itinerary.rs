//! # Flight Itinerary Module
//!
//! Turns two points on the map into a round-trip itinerary. The resolver runs
//! three dependent lookups strictly in order:
//!
//! 1. nearest airport to the origin
//! 2. nearest airport to the destination
//! 3. cheapest non-stop round trip between the two airports
//!
//! Any failing stage aborts the chain and is reported as a [`PlanError`]
//! naming that stage, since "we couldn't find an airport" and "we couldn't
//! find a flight" call for different replies.

use serde::Serialize;
use thiserror::Error;

use crate::config::TravelDates;
use crate::errors::RelayError;
use crate::services::flights::{Airport, FareQuote, FlightLeg, FlightSearch};
use crate::services::geocoding::Coordinates;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Stage of the itinerary pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStage {
    OriginAirport,
    DestinationAirport,
    FareSearch,
}

impl std::fmt::Display for TripStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TripStage::OriginAirport => "origin airport lookup",
            TripStage::DestinationAirport => "destination airport lookup",
            TripStage::FareSearch => "fare search",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{stage} failed: {source}")]
pub struct PlanError {
    pub stage: TripStage,
    #[source]
    pub source: RelayError,
}

impl PlanError {
    fn at(stage: TripStage) -> impl FnOnce(RelayError) -> PlanError {
        move |source| PlanError { stage, source }
    }
}

/// Round trip assembled from the three lookups; never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct TripItinerary {
    pub origin_airport: Airport,
    pub destination_airport: Airport,
    pub outbound: FlightLeg,
    pub inbound: FlightLeg,
    /// Whole units of currency
    pub total_price: i64,
    pub currency: String,
}

impl TripItinerary {
    /// Price attributed to each of the two legs: half the total, truncated
    pub fn leg_price(&self) -> i64 {
        self.total_price / 2
    }

    fn from_quote(origin: Airport, destination: Airport, quote: FareQuote) -> Result<Self, RelayError> {
        let total_price = parse_whole_units(&quote.total_price).ok_or_else(|| {
            RelayError::decode("flights", format!("unreadable total price '{}'", quote.total_price))
        })?;
        Ok(Self {
            origin_airport: origin,
            destination_airport: destination,
            outbound: quote.outbound,
            inbound: quote.inbound,
            total_price,
            currency: if quote.currency.is_empty() {
                DEFAULT_CURRENCY.to_string()
            } else {
                quote.currency
            },
        })
    }
}

/// Leading integer of a price string: `"345.60"` → 345, `"12"` → 12
pub fn parse_whole_units(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}

/// Chains the airport and fare lookups into a [`TripItinerary`]
pub struct FlightItineraryResolver<'a> {
    flights: &'a dyn FlightSearch,
}

impl<'a> FlightItineraryResolver<'a> {
    pub fn new(flights: &'a dyn FlightSearch) -> Self {
        Self { flights }
    }

    pub async fn plan(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        dates: &TravelDates,
    ) -> Result<TripItinerary, PlanError> {
        let origin_airport = self
            .flights
            .nearest_airport(origin)
            .await
            .map_err(PlanError::at(TripStage::OriginAirport))?;
        tracing::debug!(airport = %origin_airport.code, "Resolved origin airport");

        let destination_airport = self
            .flights
            .nearest_airport(destination)
            .await
            .map_err(PlanError::at(TripStage::DestinationAirport))?;
        tracing::debug!(airport = %destination_airport.code, "Resolved destination airport");

        let quote = self
            .flights
            .low_fare_search(&origin_airport, &destination_airport, dates)
            .await
            .map_err(PlanError::at(TripStage::FareSearch))?;

        TripItinerary::from_quote(origin_airport, destination_airport, quote)
            .map_err(PlanError::at(TripStage::FareSearch))
    }
}

// Wire format of the airline itinerary template

#[derive(Debug, Serialize)]
struct TemplateAirport<'a> {
    airport_code: &'a str,
    city: &'a str,
}

#[derive(Debug, Serialize)]
struct FlightSchedule<'a> {
    departure_time: &'a str,
    arrival_time: &'a str,
}

#[derive(Debug, Serialize)]
struct FlightInfo<'a> {
    connection_id: &'static str,
    segment_id: &'static str,
    flight_number: &'a str,
    aircraft_type: &'a str,
    departure_airport: TemplateAirport<'a>,
    arrival_airport: TemplateAirport<'a>,
    flight_schedule: FlightSchedule<'a>,
    travel_class: &'static str,
}

#[derive(Debug, Serialize)]
struct PassengerInfo {
    passenger_id: &'static str,
    name: &'static str,
}

#[derive(Debug, Serialize)]
struct ProductInfo {
    title: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct PassengerSegmentInfo {
    segment_id: &'static str,
    passenger_id: &'static str,
    seat: &'static str,
    seat_type: &'static str,
    product_info: Vec<ProductInfo>,
}

#[derive(Debug, Serialize)]
struct AirlineItineraryTemplate<'a> {
    template_type: &'static str,
    intro_message: String,
    locale: &'static str,
    pnr_number: &'static str,
    passenger_info: Vec<PassengerInfo>,
    flight_info: Vec<FlightInfo<'a>>,
    passenger_segment_info: Vec<PassengerSegmentInfo>,
    total_price: i64,
    currency: &'a str,
}

const PNR_NUMBER: &str = "A7994C";
const PASSENGER_ID: &str = "p01";
const PASSENGER_NAME: &str = "Traveller";

fn airport(a: &Airport) -> TemplateAirport<'_> {
    TemplateAirport {
        airport_code: &a.code,
        city: &a.city,
    }
}

fn flight_info<'a>(
    connection_id: &'static str,
    segment_id: &'static str,
    leg: &'a FlightLeg,
    from: &'a Airport,
    to: &'a Airport,
) -> FlightInfo<'a> {
    FlightInfo {
        connection_id,
        segment_id,
        flight_number: &leg.flight_number,
        aircraft_type: &leg.aircraft,
        departure_airport: airport(from),
        arrival_airport: airport(to),
        flight_schedule: FlightSchedule {
            departure_time: &leg.departs_at,
            arrival_time: &leg.arrives_at,
        },
        travel_class: "economy",
    }
}

fn segment(segment_id: &'static str, seat: &'static str, leg_price: i64) -> PassengerSegmentInfo {
    PassengerSegmentInfo {
        segment_id,
        passenger_id: PASSENGER_ID,
        seat,
        seat_type: "Economy",
        product_info: vec![ProductInfo {
            title: "Air fare",
            value: leg_price.to_string(),
        }],
    }
}

impl TripItinerary {
    /// `airline_itinerary` template payload for the send API
    pub fn to_template(&self, destination_label: &str) -> serde_json::Value {
        let leg_price = self.leg_price();
        let template = AirlineItineraryTemplate {
            template_type: "airline_itinerary",
            intro_message: format!("Here's your flight itinerary to {destination_label}"),
            locale: "en_US",
            pnr_number: PNR_NUMBER,
            passenger_info: vec![PassengerInfo {
                passenger_id: PASSENGER_ID,
                name: PASSENGER_NAME,
            }],
            flight_info: vec![
                flight_info("c01", "s01", &self.outbound, &self.origin_airport, &self.destination_airport),
                flight_info("c02", "s02", &self.inbound, &self.destination_airport, &self.origin_airport),
            ],
            passenger_segment_info: vec![segment("s01", "20A", leg_price), segment("s02", "20B", leg_price)],
            total_price: self.total_price,
            currency: &self.currency,
        };
        serde_json::to_value(template).unwrap_or_default()
    }
}

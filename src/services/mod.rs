//! Clients for the third-party lookups the bot relays to.
//!
//! Each integration is a trait so the orchestration code can be driven by
//! in-process fakes, plus one HTTP implementation built on
//! [`crate::http_client::ExternalService`].

pub mod flights;
pub mod geocoding;
pub mod gifs;
pub mod sms;
pub mod vision;

pub use flights::{AmadeusClient, Airport, FareQuote, FlightLeg, FlightSearch};
pub use geocoding::{Coordinates, Geocoder, GoogleGeocoder};
pub use gifs::{GifSearch, GiphyClient};
pub use sms::{SmsSender, TwilioClient};
pub use vision::{ImageClassifier, WatsonClassifier};

//! Shared fixtures: a recording send sink, scripted fakes for every external
//! service, and builders for inbound webhook events.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use jimbot::bot::BotContext;
use jimbot::config::{BotConfig, TravelDates};
use jimbot::errors::RelayError;
use jimbot::messenger::{MessageSink, MessagingEvent, SendReceipt, SendRequest};
use jimbot::records::Collection;
use jimbot::services::{
    Airport, Coordinates, FareQuote, FlightLeg, FlightSearch, Geocoder, GifSearch, ImageClassifier, SmsSender,
};
use jimbot::store::{DocumentStore, MemoryStore};

pub const APP_SECRET: &str = "test-app-secret";
pub const VALIDATION_TOKEN: &str = "test-validation-token";

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

fn unavailable(service: &'static str) -> RelayError {
    RelayError::Status {
        service,
        status: 503,
        detail: "scripted failure".to_string(),
    }
}

pub fn config_with(overrides: &[(&str, &str)]) -> BotConfig {
    let mut vars: HashMap<String, String> = [
        ("MESSENGER_APP_SECRET", APP_SECRET),
        ("MESSENGER_VALIDATION_TOKEN", VALIDATION_TOKEN),
        ("MESSENGER_PAGE_ACCESS_TOKEN", "page-token"),
        ("SERVER_URL", "https://bot.example.com"),
        ("DB_URL", "memory://"),
        ("DB_AUTH", "unused"),
        ("SMS_RECIPIENTS", "+15550001,+15550002"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    BotConfig::from_lookup(|key| vars.get(key).cloned()).expect("test configuration should load")
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SendRequest>>,
}

impl RecordingSink {
    pub fn requests(&self) -> Vec<SendRequest> {
        lock(&self.sent).clone()
    }

    pub fn texts_to(&self, recipient: &str) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .filter(|r| r.recipient_id() == recipient)
            .filter_map(|r| r.text_body().map(str::to_string))
            .collect()
    }

    pub fn to(&self, recipient: &str) -> Vec<SendRequest> {
        lock(&self.sent)
            .iter()
            .filter(|r| r.recipient_id() == recipient)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.sent).len()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn deliver(&self, request: SendRequest) -> Result<SendReceipt, RelayError> {
        let recipient_id = request.recipient_id().to_string();
        let mut sent = lock(&self.sent);
        sent.push(request);
        Ok(SendReceipt {
            recipient_id: Some(recipient_id),
            message_id: Some(format!("mid.{}", sent.len())),
        })
    }
}

#[derive(Default)]
pub struct FakeGeocoder {
    places: Mutex<HashMap<String, Coordinates>>,
    stalled: Mutex<bool>,
}

impl FakeGeocoder {
    pub fn add(&self, address: &str, point: Coordinates) {
        lock(&self.places).insert(address.to_string(), point);
    }

    /// Every later lookup hangs without ever answering
    pub fn stall(&self) {
        *lock(&self.stalled) = true;
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinates, RelayError> {
        let stalled = *lock(&self.stalled);
        if stalled {
            std::future::pending::<()>().await;
        }
        lock(&self.places)
            .get(address)
            .copied()
            .ok_or_else(|| RelayError::NotFound {
                what: format!("address '{address}'"),
            })
    }
}

/// Airports keyed by the latitude of the point asked about
#[derive(Default)]
pub struct FakeFlights {
    airports: Mutex<Vec<(f64, Airport)>>,
    fare: Mutex<Option<FareQuote>>,
    searches: Mutex<Vec<(String, String, TravelDates)>>,
}

impl FakeFlights {
    pub fn add_airport(&self, lat: f64, code: &str, city: &str) {
        lock(&self.airports).push((
            lat,
            Airport {
                code: code.to_string(),
                city: city.to_string(),
            },
        ));
    }

    pub fn set_fare(&self, total_price: &str) {
        let leg = |n: &str| FlightLeg {
            departs_at: "2016-11-25T07:00".to_string(),
            arrives_at: "2016-11-25T15:30".to_string(),
            flight_number: n.to_string(),
            aircraft: "321".to_string(),
        };
        *lock(&self.fare) = Some(FareQuote {
            outbound: leg("1001"),
            inbound: leg("1002"),
            total_price: total_price.to_string(),
            currency: "USD".to_string(),
        });
    }

    pub fn searches(&self) -> Vec<(String, String, TravelDates)> {
        lock(&self.searches).clone()
    }
}

#[async_trait]
impl FlightSearch for FakeFlights {
    async fn nearest_airport(&self, point: Coordinates) -> Result<Airport, RelayError> {
        lock(&self.airports)
            .iter()
            .find(|(lat, _)| (*lat - point.lat).abs() < 1e-9)
            .map(|(_, airport)| airport.clone())
            .ok_or_else(|| unavailable("flights"))
    }

    async fn low_fare_search(
        &self,
        origin: &Airport,
        destination: &Airport,
        dates: &TravelDates,
    ) -> Result<FareQuote, RelayError> {
        lock(&self.searches).push((origin.code.clone(), destination.code.clone(), *dates));
        lock(&self.fare).clone().ok_or_else(|| unavailable("flights"))
    }
}

#[derive(Default)]
pub struct FakeClassifier {
    labels: Mutex<Option<Vec<String>>>,
}

impl FakeClassifier {
    pub fn set_labels(&self, labels: &[&str]) {
        *lock(&self.labels) = Some(labels.iter().map(|l| l.to_string()).collect());
    }
}

#[async_trait]
impl ImageClassifier for FakeClassifier {
    async fn classify(&self, _image_url: &str) -> Result<Vec<String>, RelayError> {
        lock(&self.labels).clone().ok_or_else(|| unavailable("vision"))
    }
}

#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingSms {
    pub fn fail_for(&self, number: &str) {
        lock(&self.failing).push(number.to_string());
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }

    /// Wait for background alerts to land
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..100 {
            if lock(&self.sent).len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, to: &str, body: &str) -> Result<String, RelayError> {
        if lock(&self.failing).iter().any(|n| n == to) {
            return Err(unavailable("sms"));
        }
        let mut sent = lock(&self.sent);
        sent.push((to.to_string(), body.to_string()));
        Ok(format!("SM{}", sent.len()))
    }
}

#[derive(Default)]
pub struct FakeGifs {
    url: Mutex<Option<String>>,
}

impl FakeGifs {
    pub fn set_url(&self, url: &str) {
        *lock(&self.url) = Some(url.to_string());
    }
}

#[async_trait]
impl GifSearch for FakeGifs {
    async fn translate(&self, _text: &str) -> Result<String, RelayError> {
        lock(&self.url).clone().ok_or_else(|| unavailable("gifs"))
    }
}

/// A bot wired to fakes, with handles on every fake for assertions
pub struct TestBot {
    pub ctx: Arc<BotContext>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<MemoryStore>,
    pub geocoder: Arc<FakeGeocoder>,
    pub flights: Arc<FakeFlights>,
    pub classifier: Arc<FakeClassifier>,
    pub sms: Arc<RecordingSms>,
    pub gifs: Arc<FakeGifs>,
}

impl TestBot {
    pub fn new() -> Self {
        Self::with_config(config_with(&[]))
    }

    pub fn with_config(config: BotConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()), None)
    }

    /// Route store traffic through `store_override` while keeping `store`
    /// available for seeding and inspection
    pub fn with_store(
        config: BotConfig,
        store: Arc<MemoryStore>,
        store_override: Option<Arc<dyn DocumentStore>>,
    ) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let geocoder = Arc::new(FakeGeocoder::default());
        let flights = Arc::new(FakeFlights::default());
        let classifier = Arc::new(FakeClassifier::default());
        let sms = Arc::new(RecordingSms::default());
        let gifs = Arc::new(FakeGifs::default());

        let ctx = BotContext {
            config: Arc::new(config),
            sink: sink.clone(),
            store: store_override.unwrap_or_else(|| store.clone() as Arc<dyn DocumentStore>),
            geocoder: geocoder.clone(),
            flights: flights.clone(),
            classifier: classifier.clone(),
            sms: sms.clone(),
            gifs: gifs.clone(),
        };

        Self {
            ctx: Arc::new(ctx),
            sink,
            store,
            geocoder,
            flights,
            classifier,
            sms,
            gifs,
        }
    }

    pub async fn handle(&self, event: MessagingEvent) {
        jimbot::bot::handle_event(&self.ctx, event)
            .await
            .expect("event handling should not fail");
    }

    pub async fn say(&self, sender: &str, text: &str) {
        self.handle(text_event(sender, text)).await;
    }

    pub fn seed_group(&self, name: &str, members: &[&str]) {
        self.store.seed(
            Collection::Group,
            name,
            json!({"_id": name, "name": name, "members": members}),
        );
    }

    pub fn seed_person(&self, id: &str, first: &str, last: &str) {
        self.store.seed(
            Collection::Person,
            id,
            json!({"_id": id, "first_name": first, "last_name": last}),
        );
    }

    pub fn seed_location(&self, id: &str, lat: f64, lng: f64) {
        self.store
            .seed(Collection::Location, id, json!({"_id": id, "lat": lat, "lng": lng}));
    }

    pub async fn group_members(&self, name: &str) -> Vec<String> {
        let doc = self
            .store
            .fetch(Collection::Group, name)
            .await
            .expect("memory store never fails")
            .expect("group should exist");
        serde_json::from_value(doc.value["members"].clone()).expect("members should be strings")
    }
}

pub fn event(sender: &str, body: Value) -> MessagingEvent {
    let mut raw = json!({
        "sender": {"id": sender},
        "recipient": {"id": "PAGE_ID"},
        "timestamp": 1_476_000_000_000i64
    });
    if let (Some(raw), Some(body)) = (raw.as_object_mut(), body.as_object()) {
        for (k, v) in body {
            raw.insert(k.clone(), v.clone());
        }
    }
    serde_json::from_value(raw).expect("event fixture should deserialize")
}

pub fn text_event(sender: &str, text: &str) -> MessagingEvent {
    event(sender, json!({"message": {"mid": "mid.1", "text": text}}))
}

pub fn quick_reply_event(sender: &str, payload: &str) -> MessagingEvent {
    event(
        sender,
        json!({"message": {"mid": "mid.2", "text": "Accept", "quick_reply": {"payload": payload}}}),
    )
}

pub fn location_event(sender: &str, lat: f64, long: f64) -> MessagingEvent {
    event(
        sender,
        json!({"message": {"mid": "mid.3", "attachments": [
            {"type": "location", "payload": {"coordinates": {"lat": lat, "long": long}}}
        ]}}),
    )
}

pub fn image_event(sender: &str, url: &str) -> MessagingEvent {
    event(
        sender,
        json!({"message": {"mid": "mid.4", "attachments": [{"type": "image", "payload": {"url": url}}]}}),
    )
}

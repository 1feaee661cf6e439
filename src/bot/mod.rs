//! Bot module for handling Messenger interactions
//!
//! This module is split into several submodules:
//! - `command`: text command grammar
//! - `payload`: JSON payloads carried by invite quick replies
//! - `message_handler`: classifies messaging events and dispatches one action
//! - `groups`: group membership, meet planning and acceptance fan-out
//! - `trip`: geocoding, location sharing and trip planning
//! - `ui_builder`: builds templates and quick replies

pub mod command;
pub mod groups;
pub mod message_handler;
pub mod payload;
pub mod trip;
pub mod ui_builder;

use std::sync::Arc;

use crate::config::BotConfig;
use crate::errors::RelayError;
use crate::http_client::{build_http_client, ExternalService};
use crate::messenger::{GraphSendApi, MessageSink, OutgoingMessage, SendReceipt, SendRequest};
use crate::services::{
    AmadeusClient, FlightSearch, Geocoder, GifSearch, GiphyClient, GoogleGeocoder, ImageClassifier, SmsSender,
    TwilioClient, WatsonClassifier,
};
use crate::store::{CloudantStore, DocumentStore, MemoryStore};

pub use command::{parse_command, Command, GroupAction};
pub use message_handler::handle_event;
pub use payload::QuickReplyPayload;

/// Everything a handler needs: configuration plus one client per external
/// service. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct BotContext {
    pub config: Arc<BotConfig>,
    pub sink: Arc<dyn MessageSink>,
    pub store: Arc<dyn DocumentStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub flights: Arc<dyn FlightSearch>,
    pub classifier: Arc<dyn ImageClassifier>,
    pub sms: Arc<dyn SmsSender>,
    pub gifs: Arc<dyn GifSearch>,
}

impl BotContext {
    /// Wire up the production clients
    pub fn from_config(config: Arc<BotConfig>) -> Result<Self, RelayError> {
        let http = build_http_client(&config.recovery).map_err(|e| RelayError::Transport {
            service: "http",
            message: e.to_string(),
        })?;
        let service = |name: &'static str| ExternalService::new(name, http.clone(), &config.recovery);

        let store: Arc<dyn DocumentStore> = if config.uses_memory_store() {
            tracing::warn!("Using the in-process document store; data is lost on restart");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(CloudantStore::new(service("store"), &config.db_url, &config.db_auth)?)
        };

        Ok(Self {
            sink: Arc::new(GraphSendApi::new(
                service("send_api"),
                &config.graph_api_url,
                &config.page_access_token,
            )),
            store,
            geocoder: Arc::new(GoogleGeocoder::new(service("geocoding"), &config.keys.google_api_key)),
            flights: Arc::new(AmadeusClient::new(service("flights"), &config.keys.amadeus_api_key)),
            classifier: Arc::new(WatsonClassifier::new(service("vision"), &config.keys.watson_api_key)),
            sms: Arc::new(TwilioClient::new(service("sms"), &config.sms)),
            gifs: Arc::new(GiphyClient::new(service("gifs"), &config.keys.giphy_api_key)),
            config,
        })
    }

    pub async fn send(&self, request: SendRequest) -> Result<SendReceipt, RelayError> {
        let recipient_id = request.recipient_id().to_string();
        self.sink.deliver(request).await.inspect_err(|e| {
            tracing::error!(user_id = %recipient_id, error = %e, "Failed calling Send API");
        })
    }

    pub async fn send_text(&self, recipient_id: &str, text: impl Into<String>) -> Result<SendReceipt, RelayError> {
        self.send(SendRequest::text(recipient_id, text)).await
    }

    pub async fn send_message(
        &self,
        recipient_id: &str,
        message: OutgoingMessage,
    ) -> Result<SendReceipt, RelayError> {
        self.send(SendRequest::message(recipient_id, message)).await
    }
}

//! Delivery of outbound requests to the Graph send API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::RelayError;
use crate::http_client::ExternalService;
use crate::messenger::outgoing::SendRequest;

/// Acknowledgement returned by the send API
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SendReceipt {
    pub recipient_id: Option<String>,
    pub message_id: Option<String>,
}

/// Anything able to deliver a [`SendRequest`] to a user
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, request: SendRequest) -> Result<SendReceipt, RelayError>;
}

#[derive(Debug)]
pub struct GraphSendApi {
    service: ExternalService,
    url: String,
    access_token: String,
}

impl GraphSendApi {
    pub fn new(service: ExternalService, url: &str, access_token: &str) -> Self {
        Self {
            service,
            url: url.to_string(),
            access_token: access_token.to_string(),
        }
    }
}

#[async_trait]
impl MessageSink for GraphSendApi {
    async fn deliver(&self, request: SendRequest) -> Result<SendReceipt, RelayError> {
        let http = self
            .service
            .http()
            .post(&self.url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&request);
        let receipt: SendReceipt = self.service.json(http).await?;

        match &receipt.message_id {
            Some(message_id) => tracing::debug!(
                message_id = %message_id,
                recipient_id = ?receipt.recipient_id,
                "Successfully sent message"
            ),
            None => tracing::debug!(recipient_id = ?receipt.recipient_id, "Successfully called Send API"),
        }
        Ok(receipt)
    }
}

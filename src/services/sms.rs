//! Outbound SMS (Twilio REST API).

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SmsConfig;
use crate::errors::RelayError;
use crate::http_client::ExternalService;

const TWILIO_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send one message; returns the provider's message id
    async fn send(&self, to: &str, body: &str) -> Result<String, RelayError>;
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug)]
pub struct TwilioClient {
    service: ExternalService,
    config: SmsConfig,
}

impl TwilioClient {
    pub fn new(service: ExternalService, config: &SmsConfig) -> Self {
        Self {
            service,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    async fn send(&self, to: &str, body: &str) -> Result<String, RelayError> {
        let url = format!(
            "{TWILIO_BASE_URL}/Accounts/{}/Messages.json",
            self.config.account_sid
        );
        let request = self
            .service
            .http()
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("To", to), ("From", self.config.from.as_str()), ("Body", body)]);
        let message: MessageResource = self.service.json(request).await?;
        Ok(message.sid)
    }
}

//! # Configuration Module
//!
//! Configuration for the bot is loaded once at startup from the environment
//! (optionally seeded from a `.env` file) and shared by reference with every
//! component. Required values are checked together so a misconfigured
//! deployment reports everything that is missing in one go.

use chrono::NaiveDate;
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_GRAPH_API_URL: &str = "https://graph.facebook.com/v2.6/me/messages";
pub const DEFAULT_ASSETS_DIR: &str = "public/assets";
pub const MEMORY_STORE_URL: &str = "memory://";

/// Recovery configuration for outbound calls
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Timeout for a single outbound HTTP call in seconds
    pub operation_timeout_secs: u64,
    /// Upper bound for handling one inbound messaging event in seconds
    pub event_deadline_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 10,
            event_deadline_secs: 30,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

impl RecoveryConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn event_deadline(&self) -> Duration {
        Duration::from_secs(self.event_deadline_secs)
    }
}

/// API keys for the third-party lookups. Empty keys are allowed; the
/// corresponding calls then fail and the user gets the usual failure message.
#[derive(Debug, Clone, Default)]
pub struct ServiceKeys {
    pub google_api_key: String,
    pub amadeus_api_key: String,
    pub giphy_api_key: String,
    pub watson_api_key: String,
}

/// Twilio credentials and the static contact list alerted when a meet fills up
#[derive(Debug, Clone, Default)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub recipients: Vec<String>,
}

/// Fixed travel window used by the trip planner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelDates {
    pub departure: NaiveDate,
    pub return_date: NaiveDate,
}

impl Default for TravelDates {
    fn default() -> Self {
        Self {
            departure: NaiveDate::from_ymd_opt(2016, 11, 25).unwrap_or_default(),
            return_date: NaiveDate::from_ymd_opt(2016, 11, 28).unwrap_or_default(),
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Shared secret used for the webhook HMAC signature
    pub app_secret: String,
    /// Token echoed back by the subscription handshake
    pub validation_token: String,
    /// Page access token for the send API
    pub page_access_token: String,
    /// Public base URL, used to build asset and account-linking URLs
    pub server_url: String,
    /// Document store base URL, e.g. `https://account.cloudant.com`
    pub db_url: String,
    /// Basic auth credential for the document store
    pub db_auth: String,
    pub port: u16,
    pub graph_api_url: String,
    pub signature_required: bool,
    pub assets_dir: String,
    pub account_linking_auth_code: Option<String>,
    pub keys: ServiceKeys,
    pub sms: SmsConfig,
    pub travel_dates: TravelDates,
    pub recovery: RecoveryConfig,
}

impl BotConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut required = |key: &'static str| match get(key) {
            Some(value) => value,
            None => {
                missing.push(key);
                String::new()
            }
        };

        let app_secret = required("MESSENGER_APP_SECRET");
        let validation_token = required("MESSENGER_VALIDATION_TOKEN");
        let page_access_token = required("MESSENGER_PAGE_ACCESS_TOKEN");
        let server_url = required("SERVER_URL");
        let db_url = required("DB_URL");
        let db_auth = required("DB_AUTH");

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let defaults = RecoveryConfig::default();
        let recovery = RecoveryConfig {
            operation_timeout_secs: parse_or(
                &get,
                "OPERATION_TIMEOUT_SECS",
                defaults.operation_timeout_secs,
            )?,
            event_deadline_secs: parse_or(&get, "EVENT_DEADLINE_SECS", defaults.event_deadline_secs)?,
            circuit_breaker_threshold: parse_or(
                &get,
                "CIRCUIT_BREAKER_THRESHOLD",
                defaults.circuit_breaker_threshold,
            )?,
            circuit_breaker_reset_secs: parse_or(
                &get,
                "CIRCUIT_BREAKER_RESET_SECS",
                defaults.circuit_breaker_reset_secs,
            )?,
        };

        let default_dates = TravelDates::default();
        let travel_dates = TravelDates {
            departure: parse_date_or(&get, "TRIP_DEPARTURE_DATE", default_dates.departure)?,
            return_date: parse_date_or(&get, "TRIP_RETURN_DATE", default_dates.return_date)?,
        };
        if travel_dates.return_date < travel_dates.departure {
            return Err(ConfigError::Invalid {
                key: "TRIP_RETURN_DATE",
                message: "return date is before departure date".to_string(),
            });
        }

        Ok(Self {
            app_secret,
            validation_token,
            page_access_token,
            server_url,
            db_url,
            db_auth,
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            graph_api_url: get("GRAPH_API_URL").unwrap_or_else(|| DEFAULT_GRAPH_API_URL.to_string()),
            signature_required: parse_or(&get, "SIGNATURE_REQUIRED", true)?,
            assets_dir: get("ASSETS_DIR").unwrap_or_else(|| DEFAULT_ASSETS_DIR.to_string()),
            account_linking_auth_code: get("ACCOUNT_LINKING_AUTH_CODE"),
            keys: ServiceKeys {
                google_api_key: get("GOOGLE_API_KEY").unwrap_or_default(),
                amadeus_api_key: get("AMADEUS_API_KEY").unwrap_or_default(),
                giphy_api_key: get("GIPHY_API_KEY").unwrap_or_default(),
                watson_api_key: get("WATSON_API_KEY").unwrap_or_default(),
            },
            sms: SmsConfig {
                account_sid: get("TWILIO_ACCOUNT_SID").unwrap_or_default(),
                auth_token: get("TWILIO_AUTH_TOKEN").unwrap_or_default(),
                from: get("TWILIO_FROM").unwrap_or_default(),
                recipients: get("SMS_RECIPIENTS")
                    .map(|list| {
                        list.split(',')
                            .map(str::trim)
                            .filter(|n| !n.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            travel_dates,
            recovery,
        })
    }

    /// Whether the document store should be the in-process implementation
    pub fn uses_memory_store(&self) -> bool {
        self.db_url == MEMORY_STORE_URL
    }

    /// Absolute URL for a file under the public base URL
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_or<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_date_or<G>(get: &G, key: &'static str, default: NaiveDate) -> Result<NaiveDate, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MESSENGER_APP_SECRET", "secret"),
            ("MESSENGER_VALIDATION_TOKEN", "token"),
            ("MESSENGER_PAGE_ACCESS_TOKEN", "page-token"),
            ("SERVER_URL", "https://bot.example.com/"),
            ("DB_URL", "memory://"),
            ("DB_AUTH", "dXNlcjpwYXNz"),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let config = BotConfig::from_lookup(lookup(&required())).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.graph_api_url, DEFAULT_GRAPH_API_URL);
        assert!(config.signature_required);
        assert!(config.uses_memory_store());
        assert!(config.sms.recipients.is_empty());
        assert_eq!(config.travel_dates, TravelDates::default());
        assert_eq!(config.recovery.operation_timeout_secs, 10);
    }

    #[test]
    fn test_public_url_joins_single_slash() {
        let config = BotConfig::from_lookup(lookup(&required())).unwrap();
        assert_eq!(
            config.public_url("/assets/rift.png"),
            "https://bot.example.com/assets/rift.png"
        );
        assert_eq!(config.public_url("authorize"), "https://bot.example.com/authorize");
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut pairs = required();
        pairs.retain(|(k, _)| *k != "DB_URL");
        pairs.push(("DB_URL", "   "));
        let err = BotConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["DB_URL"]));
    }

    #[test]
    fn test_sms_recipients_split() {
        let mut pairs = required();
        pairs.push(("SMS_RECIPIENTS", "+15550001, +15550002,,"));
        let config = BotConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.sms.recipients, vec!["+15550001", "+15550002"]);
    }

    #[test]
    fn test_invalid_optional_value_rejected() {
        let mut pairs = required();
        pairs.push(("PORT", "not-a-port"));
        let err = BotConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_return_before_departure_rejected() {
        let mut pairs = required();
        pairs.push(("TRIP_DEPARTURE_DATE", "2024-05-10"));
        pairs.push(("TRIP_RETURN_DATE", "2024-05-01"));
        let err = BotConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TRIP_RETURN_DATE", .. }));
    }
}

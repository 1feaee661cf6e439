//! # Configuration Tests

use std::collections::HashMap;
use std::process::Command;

use jimbot::config::{BotConfig, DEFAULT_GRAPH_API_URL, DEFAULT_PORT};
use jimbot::errors::ConfigError;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key: &str| vars.get(key).cloned()
}

const REQUIRED: &[(&str, &str)] = &[
    ("MESSENGER_APP_SECRET", "secret"),
    ("MESSENGER_VALIDATION_TOKEN", "token"),
    ("MESSENGER_PAGE_ACCESS_TOKEN", "page"),
    ("SERVER_URL", "https://bot.example.com"),
    ("DB_URL", "https://acct.cloudant.com"),
    ("DB_AUTH", "dXNlcjpwYXNz"),
];

#[test]
fn test_every_missing_key_is_reported() {
    let err = BotConfig::from_lookup(lookup(&[("SERVER_URL", "https://x"), ("DB_AUTH", "  ")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Missing(vec![
            "MESSENGER_APP_SECRET",
            "MESSENGER_VALIDATION_TOKEN",
            "MESSENGER_PAGE_ACCESS_TOKEN",
            "DB_URL",
            "DB_AUTH",
        ])
    );
}

#[test]
fn test_defaults() {
    let config = BotConfig::from_lookup(lookup(REQUIRED)).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.graph_api_url, DEFAULT_GRAPH_API_URL);
    assert!(config.signature_required);
    assert!(!config.uses_memory_store());
    assert_eq!(config.recovery.operation_timeout_secs, 10);
    assert_eq!(config.recovery.event_deadline_secs, 30);
    assert_eq!(config.travel_dates.departure.to_string(), "2016-11-25");
    assert_eq!(config.travel_dates.return_date.to_string(), "2016-11-28");
    assert!(config.sms.recipients.is_empty());
}

#[test]
fn test_invalid_optional_value() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("PORT", "eighty"));
    let err = BotConfig::from_lookup(lookup(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
}

#[test]
fn test_return_before_departure_is_invalid() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("TRIP_DEPARTURE_DATE", "2017-01-10"));
    pairs.push(("TRIP_RETURN_DATE", "2017-01-01"));
    let err = BotConfig::from_lookup(lookup(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "TRIP_RETURN_DATE", .. }));
}

#[test]
fn test_sms_recipients_list() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("SMS_RECIPIENTS", "+15550001, +15550002,,"));
    let config = BotConfig::from_lookup(lookup(&pairs)).unwrap();
    assert_eq!(config.sms.recipients, vec!["+15550001", "+15550002"]);
}

#[test]
fn test_public_url_joins_cleanly() {
    let mut pairs = REQUIRED.to_vec();
    pairs.retain(|(k, _)| *k != "SERVER_URL");
    pairs.push(("SERVER_URL", "https://bot.example.com/"));
    let config = BotConfig::from_lookup(lookup(&pairs)).unwrap();
    assert_eq!(config.public_url("/assets/rift.png"), "https://bot.example.com/assets/rift.png");
}

/// Startup halts with a non-zero status when required settings are absent
#[test]
fn test_binary_exits_without_configuration() {
    let status = Command::new(env!("CARGO_BIN_EXE_jimbot"))
        .env_clear()
        .current_dir(std::env::temp_dir())
        .status()
        .expect("binary should start");
    assert!(!status.success());
    assert_eq!(status.code(), Some(1));
}

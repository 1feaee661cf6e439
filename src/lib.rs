//! # jimbot
//!
//! A Messenger chatbot relay. Webhook callbacks are verified, classified and
//! dispatched to one action each: group coordination backed by a revisioned
//! document store, trip planning through geocoding and flight search, meet
//! invitations with SMS alerts, and a set of demo templates.

pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod http_client;
pub mod itinerary;
pub mod messenger;
pub mod records;
pub mod server;
pub mod services;
pub mod signature;
pub mod store;

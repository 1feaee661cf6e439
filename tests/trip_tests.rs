//! # Trip Planning Tests
//!
//! Geocoding command, trip chain failures at each stage, and the rendered
//! itinerary.

mod common;

use common::{config_with, image_event, TestBot};
use jimbot::messenger::Attachment;
use jimbot::services::Coordinates;

const HOME_LAT: f64 = 37.48;
const NYC_LAT: f64 = 40.71;

fn planner() -> TestBot {
    let bot = TestBot::new();
    bot.seed_location("u1", HOME_LAT, -122.15);
    bot.geocoder.add("New York", Coordinates::new(NYC_LAT, -74.0));
    bot
}

fn itinerary_template(bot: &TestBot, user: &str) -> serde_json::Value {
    bot.sink
        .to(user)
        .into_iter()
        .find_map(|r| match r.message.and_then(|m| m.attachment) {
            Some(Attachment::Template(template)) => Some(template),
            _ => None,
        })
        .expect("an itinerary template should have been sent")
}

#[tokio::test]
async fn test_geocode_command_replies_with_point_and_map() {
    let bot = TestBot::new();
    bot.geocoder.add("Eiffel Tower", Coordinates::new(48.8584, 2.2945));
    bot.say("u1", "@location Eiffel Tower").await;

    let sent = bot.sink.to("u1");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].text_body(), Some("(48.8584, 2.2945)"));
    assert_eq!(
        sent[1].message.as_ref().unwrap().attachment,
        Some(Attachment::Image {
            url: "https://maps.googleapis.com/maps/api/staticmap?center=48.8584,2.2945&zoom=13&size=400x400"
                .to_string()
        })
    );
}

#[tokio::test]
async fn test_geocode_failure() {
    let bot = TestBot::new();
    bot.say("u1", "@location Atlantis").await;
    assert_eq!(bot.sink.texts_to("u1"), vec!["Failed to get Atlantis"]);
}

#[tokio::test]
async fn test_trip_without_starting_location() {
    let bot = TestBot::new();
    bot.say("u1", "@trip New York").await;
    assert_eq!(
        bot.sink.texts_to("u1"),
        vec!["No starting location set. Share your location with @location first."]
    );
}

#[tokio::test]
async fn test_trip_with_unknown_destination() {
    let bot = planner();
    bot.say("u1", "@trip Atlantis").await;
    assert_eq!(bot.sink.texts_to("u1"), vec!["Failed to get Atlantis"]);
}

#[tokio::test]
async fn test_trip_source_airport_failure() {
    let bot = planner();
    bot.flights.add_airport(NYC_LAT, "JFK", "New York");
    bot.say("u1", "@trip New York").await;
    assert_eq!(bot.sink.texts_to("u1"), vec!["Failed to retrieve source airport"]);
}

#[tokio::test]
async fn test_trip_destination_airport_failure() {
    let bot = planner();
    bot.flights.add_airport(HOME_LAT, "SFO", "San Francisco");
    bot.say("u1", "@trip New York").await;
    assert_eq!(bot.sink.texts_to("u1"), vec!["Failed to retrieve destination airport"]);
}

#[tokio::test]
async fn test_trip_without_fares() {
    let bot = planner();
    bot.flights.add_airport(HOME_LAT, "SFO", "San Francisco");
    bot.flights.add_airport(NYC_LAT, "JFK", "New York");
    bot.say("u1", "@trip New York").await;
    assert_eq!(bot.sink.texts_to("u1"), vec!["Failed to find flights to New York"]);
}

/// Each leg carries half the total price, truncated
#[tokio::test]
async fn test_trip_itinerary_splits_price() {
    let bot = planner();
    bot.flights.add_airport(HOME_LAT, "SFO", "San Francisco");
    bot.flights.add_airport(NYC_LAT, "JFK", "New York");
    bot.flights.set_fare("345.60");
    bot.say("u1", "@trip New York").await;

    let template = itinerary_template(&bot, "u1");
    assert_eq!(template["template_type"], "airline_itinerary");
    assert_eq!(template["intro_message"], "Here's your flight itinerary to New York");
    assert_eq!(template["total_price"], 345);
    assert_eq!(template["currency"], "USD");
    for segment in template["passenger_segment_info"].as_array().unwrap() {
        assert_eq!(segment["product_info"][0]["value"], "172");
    }
    assert_eq!(template["flight_info"][0]["departure_airport"]["airport_code"], "SFO");
    assert_eq!(template["flight_info"][1]["departure_airport"]["airport_code"], "JFK");

    let searches = bot.flights.searches();
    assert_eq!(searches.len(), 1);
    assert_eq!((searches[0].0.as_str(), searches[0].1.as_str()), ("SFO", "JFK"));
}

#[tokio::test]
async fn test_trip_uses_configured_dates() {
    let bot = TestBot::with_config(config_with(&[
        ("TRIP_DEPARTURE_DATE", "2017-03-01"),
        ("TRIP_RETURN_DATE", "2017-03-05"),
    ]));
    bot.seed_location("u1", HOME_LAT, -122.15);
    bot.geocoder.add("New York", Coordinates::new(NYC_LAT, -74.0));
    bot.flights.add_airport(HOME_LAT, "SFO", "San Francisco");
    bot.flights.add_airport(NYC_LAT, "JFK", "New York");
    bot.flights.set_fare("100");
    bot.say("u1", "@trip New York").await;

    let dates = bot.flights.searches()[0].2;
    assert_eq!(dates.departure.to_string(), "2017-03-01");
    assert_eq!(dates.return_date.to_string(), "2017-03-05");
}

#[tokio::test]
async fn test_image_starts_trip_to_recognized_place() {
    let bot = planner();
    bot.classifier.set_labels(&["New", "York", "skyline"]);
    bot.flights.add_airport(HOME_LAT, "SFO", "San Francisco");
    bot.flights.add_airport(NYC_LAT, "JFK", "New York");
    bot.flights.set_fare("250");
    bot.handle(image_event("u1", "https://x/skyline.jpg")).await;

    assert_eq!(
        bot.sink.texts_to("u1"),
        vec!["Location detected as New York. Initiating trip planner."]
    );
    let template = itinerary_template(&bot, "u1");
    assert_eq!(template["total_price"], 250);
}

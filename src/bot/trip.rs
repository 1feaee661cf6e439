//! Location sharing, geocoding and trip planning.

use anyhow::Result;
use tracing::{debug, error, info, warn};

use super::ui_builder::image_message;
use super::BotContext;
use crate::errors::RelayError;
use crate::itinerary::{FlightItineraryResolver, TripStage};
use crate::messenger::{Attachment, OutgoingMessage};
use crate::records::{Collection, LocationRecord};
use crate::services::vision::location_query;
use crate::services::Coordinates;
use crate::store::{create_record, fetch_record, update_record, Versioned};

pub const NO_STARTING_LOCATION: &str = "No starting location set. Share your location with @location first.";

/// `@location <address>`: reply with the coordinates and a map of the point
pub async fn send_geocoded_location(ctx: &BotContext, sender: &str, address: &str) -> Result<()> {
    match ctx.geocoder.resolve(address).await {
        Ok(point) => {
            info!(user_id = %sender, address = %address, "Successfully geocoded location");
            ctx.send_text(sender, point.to_string()).await?;
            ctx.send_message(sender, image_message(point.static_map_url())).await?;
        }
        Err(e) => {
            warn!(user_id = %sender, address = %address, error = %e, "Failed to geocode location");
            ctx.send_text(sender, format!("Failed to get {address}")).await?;
        }
    }
    Ok(())
}

/// Store the sender's shared location, creating or updating their record
pub async fn save_location(ctx: &BotContext, sender: &str, point: Coordinates) -> Result<()> {
    let reply = match upsert_location(ctx, sender, point).await {
        Ok(()) => {
            info!(user_id = %sender, lat = point.lat, lng = point.lng, "Successfully updated location");
            "Successfully updated location"
        }
        Err(e) if e.is_conflict() => {
            warn!(user_id = %sender, "Failed to update location (bad rev)");
            "Failed to update location (bad rev)"
        }
        Err(e) => {
            error!(user_id = %sender, error = %e, "Failed to update location");
            "Failed to update location"
        }
    };
    ctx.send_text(sender, reply).await?;
    Ok(())
}

async fn upsert_location(ctx: &BotContext, sender: &str, point: Coordinates) -> Result<(), RelayError> {
    let store = ctx.store.as_ref();
    let record = LocationRecord {
        id: sender.to_string(),
        lat: point.lat,
        lng: point.lng,
    };
    match fetch_record::<LocationRecord>(store, Collection::Location, sender).await? {
        Some(existing) => {
            let updated: Versioned<LocationRecord> = existing.map(|_| record);
            update_record(store, Collection::Location, sender, &updated).await?;
        }
        None => {
            create_record(store, Collection::Location, sender, &record).await?;
        }
    }
    Ok(())
}

/// `@trip <destination>`: itinerary from the sender's last shared location
pub async fn start_trip(ctx: &BotContext, sender: &str, destination: &str) -> Result<()> {
    let origin = match fetch_record::<LocationRecord>(ctx.store.as_ref(), Collection::Location, sender).await {
        Ok(Some(location)) => Coordinates::new(location.value.lat, location.value.lng),
        Ok(None) => {
            ctx.send_text(sender, NO_STARTING_LOCATION).await?;
            return Ok(());
        }
        Err(e) => {
            error!(user_id = %sender, error = %e, "Failed to load starting location");
            ctx.send_text(sender, "Failed to load starting location").await?;
            return Ok(());
        }
    };

    let target = match ctx.geocoder.resolve(destination).await {
        Ok(point) => point,
        Err(e) => {
            warn!(user_id = %sender, destination = %destination, error = %e, "Failed to geocode destination");
            ctx.send_text(sender, format!("Failed to get {destination}")).await?;
            return Ok(());
        }
    };
    debug!(user_id = %sender, origin = %origin, destination = %target, "Planning trip");

    let resolver = FlightItineraryResolver::new(ctx.flights.as_ref());
    match resolver.plan(origin, target, &ctx.config.travel_dates).await {
        Ok(itinerary) => {
            info!(
                user_id = %sender,
                from = %itinerary.origin_airport.code,
                to = %itinerary.destination_airport.code,
                total_price = itinerary.total_price,
                "Trip itinerary ready"
            );
            let template = itinerary.to_template(destination);
            ctx.send_message(sender, OutgoingMessage::attachment(Attachment::Template(template)))
                .await?;
        }
        Err(e) => {
            error!(user_id = %sender, stage = %e.stage, error = %e.source, "Trip planning failed");
            let reply = match e.stage {
                TripStage::OriginAirport => "Failed to retrieve source airport".to_string(),
                TripStage::DestinationAirport => "Failed to retrieve destination airport".to_string(),
                TripStage::FareSearch => format!("Failed to find flights to {destination}"),
            };
            ctx.send_text(sender, reply).await?;
        }
    }
    Ok(())
}

/// Image attachment: guess the pictured place and plan a trip there
pub async fn recognize_location(ctx: &BotContext, sender: &str, image_url: &str) -> Result<()> {
    let query = match ctx.classifier.classify(image_url).await {
        Ok(labels) => location_query(&labels),
        Err(e) => {
            warn!(user_id = %sender, error = %e, "Image classification failed");
            None
        }
    };
    let Some(query) = query else {
        ctx.send_text(sender, "Could not recognize a location in that image").await?;
        return Ok(());
    };

    info!(user_id = %sender, location = %query, "Recognized location");
    ctx.send_text(sender, format!("Location detected as {query}. Initiating trip planner."))
        .await?;
    start_trip(ctx, sender, &query).await
}

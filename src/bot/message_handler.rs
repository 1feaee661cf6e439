//! Message Handler module for processing incoming messaging events
//!
//! Every event is classified once and leads to at most one downstream action.

use anyhow::Result;
use tracing::{debug, info, warn};

use super::command::{parse_command, Command};
use super::groups::{contact_members, handle_group_command, plan_meet};
use super::payload::QuickReplyPayload;
use super::trip::{recognize_location, save_location, send_geocoded_location, start_trip};
use super::ui_builder::{self, Asset};
use super::BotContext;
use crate::messenger::webhook::InboundAttachment;
use crate::messenger::{EventKind, InboundMessage, MessagingEvent, SendRequest, SenderAction};
use crate::services::Coordinates;

/// Entry point for a single messaging event
pub async fn handle_event(ctx: &BotContext, event: MessagingEvent) -> Result<()> {
    let sender = event.sender_id();

    match event.kind() {
        EventKind::Authentication(optin) => {
            info!(
                user_id = %sender,
                page_id = %event.recipient.id,
                pass_through = ?optin.pass_through,
                timestamp = ?event.timestamp,
                "Received authentication"
            );
            ctx.send_text(sender, "Authentication successful").await?;
        }
        EventKind::Message(message) => handle_message(ctx, sender, message).await?,
        EventKind::Delivery(delivery) => {
            for mid in &delivery.mids {
                debug!(message_id = %mid, "Received delivery confirmation");
            }
            info!(watermark = delivery.watermark, "All messages before watermark were delivered");
        }
        EventKind::Postback(postback) => {
            info!(user_id = %sender, payload = %postback.payload, "Received postback");
            ctx.send_text(sender, "Postback called").await?;
        }
        EventKind::Read(read) => {
            info!(user_id = %sender, watermark = read.watermark, seq = ?read.seq, "Received message read event");
        }
        EventKind::AccountLink(link) => {
            info!(
                user_id = %sender,
                status = %link.status,
                authorization_code = ?link.authorization_code,
                "Received account link event"
            );
        }
        EventKind::Unknown => warn!(user_id = %sender, "Webhook received unknown messaging event"),
    }
    Ok(())
}

async fn handle_message(ctx: &BotContext, sender: &str, message: &InboundMessage) -> Result<()> {
    if message.is_echo {
        info!(
            message_id = ?message.mid,
            app_id = ?message.app_id,
            metadata = ?message.metadata,
            "Received echo"
        );
        return Ok(());
    }

    if let Some(quick_reply) = &message.quick_reply {
        debug!(user_id = %sender, payload = %quick_reply.payload, "Quick reply tapped");
        let payload = match QuickReplyPayload::parse(&quick_reply.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(user_id = %sender, error = %e, "Dropping quick reply with malformed payload");
                return Ok(());
            }
        };
        if payload.is_meet() {
            return contact_members(ctx, sender, &payload).await;
        }
        ctx.send_text(sender, "Quick reply tapped").await?;
        return Ok(());
    }

    if let Some(text) = &message.text {
        let command = parse_command(text);
        debug!(user_id = %sender, command = ?command, "Dispatching text command");
        return dispatch_command(ctx, sender, command).await;
    }

    if let Some(attachment) = message.attachments.first() {
        return handle_attachment(ctx, sender, attachment).await;
    }

    debug!(user_id = %sender, "Message without text or attachments");
    Ok(())
}

async fn handle_attachment(ctx: &BotContext, sender: &str, attachment: &InboundAttachment) -> Result<()> {
    let payload = attachment.payload.as_ref();
    match attachment.kind.as_str() {
        "location" => {
            if let Some(shared) = payload.and_then(|p| p.coordinates) {
                return save_location(ctx, sender, Coordinates::new(shared.lat, shared.long)).await;
            }
        }
        "image" => {
            if let Some(url) = payload.and_then(|p| p.url.as_deref()) {
                return recognize_location(ctx, sender, url).await;
            }
        }
        _ => {}
    }
    ctx.send_text(sender, "Message with attachment received").await?;
    Ok(())
}

/// Run the single action a text command maps to
pub async fn dispatch_command(ctx: &BotContext, sender: &str, command: Command) -> Result<()> {
    let config = ctx.config.as_ref();

    match command {
        Command::Image => ctx.send_message(sender, ui_builder::asset_message(config, Asset::Image)).await?,
        Command::Gif => ctx.send_message(sender, ui_builder::asset_message(config, Asset::Gif)).await?,
        Command::Audio => ctx.send_message(sender, ui_builder::asset_message(config, Asset::Audio)).await?,
        Command::Video => ctx.send_message(sender, ui_builder::asset_message(config, Asset::Video)).await?,
        Command::File => ctx.send_message(sender, ui_builder::asset_message(config, Asset::File)).await?,
        Command::Button => ctx.send_message(sender, ui_builder::button_template()).await?,
        Command::Generic => ctx.send_message(sender, ui_builder::generic_template(config)).await?,
        Command::Receipt => {
            let order_number = ui_builder::random_order_number();
            ctx.send_message(sender, ui_builder::receipt_template(config, &order_number))
                .await?
        }
        Command::QuickReply => ctx.send_message(sender, ui_builder::movie_genre_quick_replies()).await?,
        Command::ReadReceipt => {
            debug!(user_id = %sender, "Sending a read receipt to mark message as seen");
            ctx.send(SendRequest::action(sender, SenderAction::MarkSeen)).await?
        }
        Command::TypingOn => ctx.send(SendRequest::action(sender, SenderAction::TypingOn)).await?,
        Command::TypingOff => ctx.send(SendRequest::action(sender, SenderAction::TypingOff)).await?,
        Command::AccountLinking => ctx.send_message(sender, ui_builder::account_linking(config)).await?,
        Command::Cat => {
            match ctx.gifs.translate("cat").await {
                Ok(url) => {
                    ctx.send_message(sender, ui_builder::image_message(url)).await?;
                }
                Err(e) => warn!(user_id = %sender, error = %e, "Failed to get cat picture"),
            }
            return Ok(());
        }
        Command::Geocode { address } => return send_geocoded_location(ctx, sender, &address).await,
        Command::CustomSend { recipient, text } => {
            info!(user_id = %sender, recipient = %recipient, "Relaying custom message");
            ctx.send_text(&recipient, text).await?
        }
        Command::Group { action, group } => return handle_group_command(ctx, sender, &action, &group).await,
        Command::LocationQuery => ctx.send_message(sender, ui_builder::location_request()).await?,
        Command::Trip { destination } => return start_trip(ctx, sender, &destination).await,
        Command::Meet {
            group,
            event,
            threshold,
        } => return plan_meet(ctx, sender, &group, &event, threshold).await,
        Command::Echo(text) => ctx.send_text(sender, text).await?,
    };
    Ok(())
}

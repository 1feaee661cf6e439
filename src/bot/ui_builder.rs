//! UI Builder module for creating templates and quick replies

use rand::Rng;
use serde_json::json;

use super::payload::{QuickReplyPayload, STATUS_ACCEPTED, STATUS_DECLINED};
use crate::config::BotConfig;
use crate::messenger::{Attachment, OutgoingMessage, QuickReply};

const ACCEPT_ICON_URL: &str = "https://cdn0.iconfinder.com/data/icons/small-n-flat/24/678134-sign-check-128.png";
const DECLINE_ICON_URL: &str =
    "https://cdn3.iconfinder.com/data/icons/flat-actions-icons-9/792/Close_Icon_Dark-128.png";

/// Static media served from the assets directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    Image,
    Gif,
    Audio,
    Video,
    File,
}

impl Asset {
    pub fn file_name(&self) -> &'static str {
        match self {
            Asset::Image => "rift.png",
            Asset::Gif => "instagram_logo.gif",
            Asset::Audio => "sample.mp3",
            Asset::Video => "allofus480.mov",
            Asset::File => "test.txt",
        }
    }
}

fn asset_url(config: &BotConfig, file_name: &str) -> String {
    config.public_url(&format!("assets/{file_name}"))
}

pub fn asset_message(config: &BotConfig, asset: Asset) -> OutgoingMessage {
    let url = asset_url(config, asset.file_name());
    let attachment = match asset {
        Asset::Image | Asset::Gif => Attachment::Image { url },
        Asset::Audio => Attachment::Audio { url },
        Asset::Video => Attachment::Video { url },
        Asset::File => Attachment::File { url },
    };
    OutgoingMessage::attachment(attachment)
}

pub fn image_message(url: impl Into<String>) -> OutgoingMessage {
    OutgoingMessage::attachment(Attachment::Image { url: url.into() })
}

pub fn button_template() -> OutgoingMessage {
    OutgoingMessage::attachment(Attachment::Template(json!({
        "template_type": "button",
        "text": "This is test text",
        "buttons": [
            {"type": "web_url", "url": "https://www.oculus.com/en-us/rift/", "title": "Open Web URL"},
            {"type": "postback", "title": "Trigger Postback", "payload": "DEVELOPER_DEFINED_PAYLOAD"},
            {"type": "phone_number", "title": "Call Phone Number", "payload": "+16505551234"}
        ]
    })))
}

pub fn generic_template(config: &BotConfig) -> OutgoingMessage {
    let bubble = |title: &str, subtitle: &str, page: &str, image: &str, payload: &str| {
        let page_url = format!("https://www.oculus.com/en-us/{page}/");
        json!({
            "title": title,
            "subtitle": subtitle,
            "item_url": page_url,
            "image_url": asset_url(config, image),
            "buttons": [
                {"type": "web_url", "url": page_url, "title": "Open Web URL"},
                {"type": "postback", "title": "Call Postback", "payload": payload}
            ]
        })
    };

    OutgoingMessage::attachment(Attachment::Template(json!({
        "template_type": "generic",
        "elements": [
            bubble("rift", "Next-generation virtual reality", "rift", "rift.png", "Payload for first bubble"),
            bubble("touch", "Your Hands, Now in VR", "touch", "touch.png", "Payload for second bubble")
        ]
    })))
}

/// Receipt numbers only need to be unique enough for the demo
pub fn random_order_number() -> String {
    format!("order{}", rand::thread_rng().gen_range(0..1000))
}

pub fn receipt_template(config: &BotConfig, order_number: &str) -> OutgoingMessage {
    OutgoingMessage::attachment(Attachment::Template(json!({
        "template_type": "receipt",
        "recipient_name": "Peter Chang",
        "order_number": order_number,
        "currency": "USD",
        "payment_method": "Visa 1234",
        "timestamp": "1428444852",
        "elements": [
            {
                "title": "Oculus Rift",
                "subtitle": "Includes: headset, sensor, remote",
                "quantity": 1,
                "price": 599.00,
                "currency": "USD",
                "image_url": asset_url(config, "riftsq.png")
            },
            {
                "title": "Samsung Gear VR",
                "subtitle": "Frost White",
                "quantity": 1,
                "price": 99.99,
                "currency": "USD",
                "image_url": asset_url(config, "gearvrsq.png")
            }
        ],
        "address": {
            "street_1": "1 Hacker Way",
            "street_2": "",
            "city": "Menlo Park",
            "postal_code": "94025",
            "state": "CA",
            "country": "US"
        },
        "summary": {
            "subtotal": 698.99,
            "shipping_cost": 20.00,
            "total_tax": 57.67,
            "total_cost": 626.66
        },
        "adjustments": [
            {"name": "New Customer Discount", "amount": -50},
            {"name": "$100 Off Coupon", "amount": -100}
        ]
    })))
}

pub fn movie_genre_quick_replies() -> OutgoingMessage {
    OutgoingMessage::with_quick_replies(
        "What's your favorite movie genre?",
        vec![
            QuickReply::text("Action", "DEVELOPER_DEFINED_PAYLOAD_FOR_PICKING_ACTION"),
            QuickReply::text("Comedy", "DEVELOPER_DEFINED_PAYLOAD_FOR_PICKING_COMEDY"),
            QuickReply::text("Drama", "DEVELOPER_DEFINED_PAYLOAD_FOR_PICKING_DRAMA"),
        ],
    )
}

pub fn location_request() -> OutgoingMessage {
    OutgoingMessage::with_quick_replies("Please share your location:", vec![QuickReply::location()])
}

pub fn account_linking(config: &BotConfig) -> OutgoingMessage {
    OutgoingMessage::attachment(Attachment::Template(json!({
        "template_type": "button",
        "text": "Welcome. Link your account.",
        "buttons": [{"type": "account_link", "url": config.public_url("authorize")}]
    })))
}

/// Invitation sent to one member, with Accept/Decline replies addressed to them
pub fn invite_message(organizer_name: &str, event: &str, member: &str, group: &str) -> OutgoingMessage {
    let reply = |title: &str, status: &str, icon: &str| {
        QuickReply::text(title, QuickReplyPayload::meet(status, member, event, group).encode()).with_image(icon)
    };
    OutgoingMessage::with_quick_replies(
        format!("{organizer_name} has invited you to {event}"),
        vec![
            reply("Accept", STATUS_ACCEPTED, ACCEPT_ICON_URL),
            reply("Decline", STATUS_DECLINED, DECLINE_ICON_URL),
        ],
    )
}

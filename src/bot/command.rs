//! # Command Grammar
//!
//! Text commands are matched against the start of the message, case
//! sensitive, in a fixed priority order. The first pattern that matches wins;
//! text matching nothing is echoed back unchanged.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GEOCODE: Regex = Regex::new(r"^@location .+").expect("geocode pattern should be valid");
    static ref CUSTOM_SEND: Regex = Regex::new(r"^@send \S+ .+").expect("send pattern should be valid");
    static ref GROUP: Regex = Regex::new(r"^@group \S+ \S+").expect("group pattern should be valid");
    static ref TRIP: Regex = Regex::new(r"^@trip .+").expect("trip pattern should be valid");
    static ref MEET: Regex = Regex::new(r"^@meet \S+ \S+ \d+").expect("meet pattern should be valid");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupAction {
    Create,
    Join,
    Leave,
    Unknown(String),
}

impl GroupAction {
    fn parse(action: &str) -> Self {
        match action {
            "create" => GroupAction::Create,
            "join" => GroupAction::Join,
            "leave" => GroupAction::Leave,
            other => GroupAction::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Image,
    Gif,
    Audio,
    Video,
    File,
    Button,
    Generic,
    Receipt,
    QuickReply,
    ReadReceipt,
    TypingOn,
    TypingOff,
    AccountLinking,
    Cat,
    Geocode { address: String },
    CustomSend { recipient: String, text: String },
    Group { action: GroupAction, group: String },
    LocationQuery,
    Trip { destination: String },
    Meet { group: String, event: String, threshold: u32 },
    Echo(String),
}

/// Fixed-argument commands matched on a bare prefix, in priority order
const PREFIX_COMMANDS: &[(&str, fn() -> Command)] = &[
    ("@image", || Command::Image),
    ("@gif", || Command::Gif),
    ("@audio", || Command::Audio),
    ("@video", || Command::Video),
    ("@file", || Command::File),
    ("@button", || Command::Button),
    ("@generic", || Command::Generic),
    ("@receipt", || Command::Receipt),
    ("@quick reply", || Command::QuickReply),
    ("@read receipt", || Command::ReadReceipt),
    ("@typing on", || Command::TypingOn),
    ("@typing off", || Command::TypingOff),
    ("@account linking", || Command::AccountLinking),
    ("@cat", || Command::Cat),
];

/// Split on `delim` into `count` leading pieces plus the untouched tail.
/// Always returns `count + 1` items, padding with empty strings.
pub fn split_with_tail(text: &str, delim: char, count: usize) -> Vec<&str> {
    let mut parts: Vec<&str> = text.splitn(count + 1, delim).collect();
    while parts.len() < count + 1 {
        parts.push("");
    }
    parts
}

/// Leading decimal digits as a number, saturating on overflow
fn leading_number(text: &str) -> u32 {
    text.chars()
        .take_while(|c| c.is_ascii_digit())
        .fold(0u32, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(c.to_digit(10).unwrap_or(0))
        })
}

/// Classify a text message
pub fn parse_command(text: &str) -> Command {
    if let Some((_, build)) = PREFIX_COMMANDS.iter().find(|(prefix, _)| text.starts_with(prefix)) {
        return build();
    }

    if GEOCODE.is_match(text) {
        let address = text.strip_prefix("@location ").unwrap_or_default();
        return Command::Geocode {
            address: address.to_string(),
        };
    }
    if CUSTOM_SEND.is_match(text) {
        let args = split_with_tail(text, ' ', 2);
        return Command::CustomSend {
            recipient: args[1].to_string(),
            text: args[2].to_string(),
        };
    }
    if GROUP.is_match(text) {
        let args = split_with_tail(text, ' ', 2);
        return Command::Group {
            action: GroupAction::parse(args[1]),
            group: args[2].to_string(),
        };
    }
    if text.starts_with("@location") {
        return Command::LocationQuery;
    }
    if TRIP.is_match(text) {
        let args = split_with_tail(text, ' ', 1);
        return Command::Trip {
            destination: args[1].to_string(),
        };
    }
    if MEET.is_match(text) {
        let args = split_with_tail(text, ' ', 3);
        return Command::Meet {
            group: args[1].to_string(),
            event: args[2].to_string(),
            threshold: leading_number(args[3]),
        };
    }

    Command::Echo(text.to_string())
}

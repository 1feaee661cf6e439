//! Messenger platform plumbing: the inbound webhook model, the outbound
//! send-request model and the sink that delivers outbound requests.

pub mod outgoing;
pub mod send_api;
pub mod webhook;

pub use outgoing::{Attachment, OutgoingMessage, QuickReply, SendRequest, SenderAction};
pub use send_api::{GraphSendApi, MessageSink, SendReceipt};
pub use webhook::{EventKind, InboundMessage, MessagingEvent, WebhookPayload};

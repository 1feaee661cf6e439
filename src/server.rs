//! HTTP surface: webhook verification and delivery, account linking and
//! static assets.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::bot::{handle_event, BotContext};
use crate::messenger::{MessagingEvent, WebhookPayload};
use crate::signature::{self, SignatureCheck, SIGNATURE_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<BotContext>,
}

pub fn build_router(ctx: Arc<BotContext>) -> Router {
    let assets = ServeDir::new(&ctx.config.assets_dir);
    Router::new()
        .route("/", get(index))
        .route("/webhook", get(verify_subscription).post(receive_webhook))
        .route("/authorize", get(authorize))
        .nest_service("/assets", assets)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { ctx })
}

async fn index() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html><html><head><title>jimbot</title></head>\
         <body><h1>jimbot</h1><p>Messenger bot webhook is running.</p></body></html>",
    )
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

async fn verify_subscription(State(state): State<AppState>, Query(params): Query<SubscriptionParams>) -> Response {
    let token_matches = params.verify_token.as_deref() == Some(state.ctx.config.validation_token.as_str());
    if params.mode.as_deref() == Some("subscribe") && token_matches {
        info!("Validating webhook");
        return params.challenge.unwrap_or_default().into_response();
    }
    warn!(mode = ?params.mode, "Failed validation. Make sure the validation tokens match.");
    StatusCode::FORBIDDEN.into_response()
}

async fn receive_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let config = &state.ctx.config;
    let header = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    match signature::verify(&config.app_secret, header, &body) {
        SignatureCheck::Valid => {}
        SignatureCheck::Mismatch => {
            warn!("Couldn't validate the request signature");
            return StatusCode::FORBIDDEN;
        }
        SignatureCheck::Missing if config.signature_required => {
            warn!("Rejecting webhook without a signature");
            return StatusCode::FORBIDDEN;
        }
        SignatureCheck::Missing => warn!("Couldn't validate the signature: header missing"),
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Webhook body is not a valid payload");
            return StatusCode::BAD_REQUEST;
        }
    };
    if !payload.is_page_subscription() {
        debug!(object = %payload.object, "Ignoring non-page webhook");
        return StatusCode::NOT_FOUND;
    }

    // Acknowledge at once; handlers run independently of the response
    for event in payload.into_events() {
        spawn_event(state.ctx.clone(), event);
    }
    StatusCode::OK
}

/// Run one event in its own task, abandoned once the event deadline passes
pub fn spawn_event(ctx: Arc<BotContext>, event: MessagingEvent) -> JoinHandle<()> {
    let deadline = ctx.config.recovery.event_deadline();
    tokio::spawn(async move {
        let sender = event.sender_id().to_string();
        match tokio::time::timeout(deadline, handle_event(&ctx, event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(user_id = %sender, error = %e, "Event handling failed"),
            Err(_) => warn!(
                user_id = %sender,
                deadline_secs = deadline.as_secs(),
                "Event handling exceeded its deadline and was cancelled"
            ),
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    account_linking_token: Option<String>,
    redirect_uri: Option<String>,
}

async fn authorize(State(state): State<AppState>, Query(params): Query<AuthorizeParams>) -> Html<String> {
    let auth_code = state
        .ctx
        .config
        .account_linking_auth_code
        .clone()
        .unwrap_or_else(random_auth_code);
    let redirect_uri = params.redirect_uri.unwrap_or_default();
    let success_uri = format!("{redirect_uri}&authorization_code={auth_code}");
    Html(authorize_page(
        params.account_linking_token.as_deref().unwrap_or_default(),
        &redirect_uri,
        &success_uri,
    ))
}

fn random_auth_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

fn authorize_page(token: &str, redirect_uri: &str, success_uri: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Link your account</title></head><body>\
         <h1>Link your account</h1>\
         <p>Account linking token: {}</p>\
         <p>Redirect URI: {}</p>\
         <a href=\"{}\">Complete account link</a>\
         </body></html>",
        escape_html(token),
        escape_html(redirect_uri),
        escape_html(success_uri),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

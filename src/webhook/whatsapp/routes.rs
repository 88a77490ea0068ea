//! WhatsApp webhook endpoint handlers
//!
//! Verification endpoint (GET) and event receiver (POST). The same handlers
//! are mounted on `/webhook` and on `/`.

use super::{handler, verification};
use crate::state::AppState;
use ntex::{util::Bytes, web};
use serde::Deserialize;
use tracing::Instrument;

/// Query parameters for webhook verification
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    /// The mode parameter, should be "subscribe"
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    /// The verification token from WhatsApp
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    /// The challenge string to echo back
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Webhook verification endpoint (GET)
///
/// # Returns
/// - 200 with the challenge as plain text if verification succeeds
/// - 400 if a parameter is missing
/// - 403 if the mode or the token does not match
/// - 500 if no verify token is configured
pub async fn verify(
    query: web::types::Query<VerifyQuery>,
    app_state: web::types::State<AppState>,
) -> Result<web::HttpResponse, verification::VerificationError> {
    let challenge = verification::verify(
        query.mode.as_deref(),
        query.verify_token.as_deref(),
        query.challenge.as_deref(),
        app_state.config.verify_token(),
    )?;

    Ok(web::HttpResponse::Ok()
        .content_type("text/plain")
        .body(challenge))
}

/// Webhook receiver endpoint (POST)
///
/// Processed synchronously, WhatsApp gives us 20 seconds to respond.
///
/// # Returns
/// - 200 once the payload is dispatched (or ignored)
/// - 400 if the body is not JSON
/// - 500 if the envelope is structurally invalid
pub async fn receive(body: Bytes, app_state: web::types::State<AppState>) -> web::HttpResponse {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            logfire::error!(
                "Failed to parse webhook payload: {error}",
                error = e.to_string()
            );
            return web::HttpResponse::BadRequest().finish();
        }
    };

    let processed = handler::process_webhook(&payload, app_state.auto_reply_client())
        .instrument(logfire::span!("whatsapp_webhook"))
        .await;

    match processed {
        Ok(_) => web::HttpResponse::Ok().finish(),
        Err(e) => {
            logfire::error!("Failed to process webhook: {error}", error = e.to_string());
            web::HttpResponse::InternalServerError().finish()
        }
    }
}

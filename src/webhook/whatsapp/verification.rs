//! Webhook verification handshake
//!
//! When a webhook URL is registered, Meta sends a GET request carrying
//! `hub.mode`, `hub.verify_token` and `hub.challenge`. The endpoint must echo
//! the challenge verbatim when the mode is `subscribe` and the token matches
//! the configured secret.
//!
//! The token comparison is constant-time.

use crate::consts;
use derive_more::{Display, Error};
use ntex::{http, web};
use subtle::ConstantTimeEq;

#[derive(Debug, Display, Error, PartialEq)]
pub enum VerificationError {
    /// `hub.mode`, `hub.verify_token` or `hub.challenge` is absent or empty
    #[display("missing required parameters")]
    MissingParameter,
    /// No verify token configured on this side
    #[display("server configuration error")]
    ServerMisconfigured,
    /// Wrong mode or wrong token
    #[display("forbidden")]
    TokenMismatch,
}

impl web::error::WebResponseError for VerificationError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        let body = match self {
            VerificationError::MissingParameter => "Missing required parameters",
            VerificationError::ServerMisconfigured => "Server configuration error",
            VerificationError::TokenMismatch => "Forbidden",
        };

        web::HttpResponse::build(self.status_code())
            .content_type("text/plain")
            .body(body)
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            VerificationError::MissingParameter => http::StatusCode::BAD_REQUEST,
            VerificationError::ServerMisconfigured => http::StatusCode::INTERNAL_SERVER_ERROR,
            VerificationError::TokenMismatch => http::StatusCode::FORBIDDEN,
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn tokens_match(received: &str, expected: &str) -> bool {
    received.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Checks the handshake parameters and returns the challenge to echo back.
///
/// # Arguments
/// * `mode` - value of `hub.mode`
/// * `verify_token` - value of `hub.verify_token`
/// * `challenge` - value of `hub.challenge`, returned byte for byte on success
/// * `expected_token` - configured secret, `None` when unset
pub fn verify(
    mode: Option<&str>,
    verify_token: Option<&str>,
    challenge: Option<&str>,
    expected_token: Option<&str>,
) -> Result<String, VerificationError> {
    let (Some(mode), Some(verify_token), Some(challenge)) =
        (present(mode), present(verify_token), present(challenge))
    else {
        logfire::warn!(
            "Webhook verification missing parameters: mode={mode}, token_present={token_present}, challenge={challenge}",
            mode = mode.unwrap_or_default().to_string(),
            token_present = present(verify_token).is_some(),
            challenge = challenge.unwrap_or_default().to_string()
        );
        return Err(VerificationError::MissingParameter);
    };

    let Some(expected_token) = present(expected_token) else {
        logfire::error!("Webhook verify token is not configured");
        return Err(VerificationError::ServerMisconfigured);
    };

    let mode_match = mode == consts::SUBSCRIBE_MODE;
    let token_match = tokens_match(verify_token, expected_token);

    logfire::info!(
        "Webhook verification attempt: mode={mode}, challenge={challenge}, mode_match={mode_match}, token_match={token_match}",
        mode = mode.to_string(),
        challenge = challenge.to_string(),
        mode_match = mode_match,
        token_match = token_match
    );

    if !(mode_match && token_match) {
        return Err(VerificationError::TokenMismatch);
    }

    Ok(challenge.to_string())
}

use derive_more::{Display, Error};
use ntex::{http, web};
use serde_json::json;

/// Failure talking to the WhatsApp Graph API
#[derive(Debug, Display, Error)]
pub enum ProviderError {
    #[display("WhatsApp credentials not configured: {_0}")]
    MissingCredentials(#[error(not(source))] &'static str),
    #[display("WhatsApp API returned error status {status}: {message}")]
    Rejected {
        status: u16,
        message: String,
        details: serde_json::Value,
    },
    #[display("failed to send request to WhatsApp API: {_0}")]
    Transport(reqwest::Error),
    #[display("failed to parse WhatsApp API response: {_0}")]
    Decode(#[error(not(source))] String),
}

impl ProviderError {
    /// Provider-side detail worth surfacing to the caller
    pub fn details(&self) -> serde_json::Value {
        match self {
            ProviderError::Rejected { details, .. } => details.clone(),
            other => json!(other.to_string()),
        }
    }
}

/// Errors of the JSON endpoints, rendered as `{"success": false, "error": ...}`
#[derive(Debug, Display, Error)]
pub enum ApiError {
    #[display("{_0}")]
    Validation(#[error(not(source))] String),
    #[display("{_0}")]
    Configuration(#[error(not(source))] String),
    #[display("{_0}")]
    Internal(#[error(not(source))] String),
    #[display("{message}")]
    Provider {
        message: String,
        details: serde_json::Value,
    },
}

impl ApiError {
    /// Maps a provider failure, `message` describes the attempted operation.
    pub fn from_provider(message: &str, err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredentials(_) => {
                ApiError::Configuration("WhatsApp credentials not configured".into())
            }
            other => ApiError::Provider {
                message: message.to_string(),
                details: other.details(),
            },
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Provider { message, details } => json!({
                "success": false,
                "error": message,
                "details": details,
            }),
            other => json!({
                "success": false,
                "error": other.to_string(),
            }),
        }
    }
}

impl From<web::error::JsonPayloadError> for ApiError {
    fn from(err: web::error::JsonPayloadError) -> Self {
        ApiError::Validation(format!("Invalid request body: {err}"))
    }
}

impl web::error::WebResponseError for ApiError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        logfire::error!("{error}", error = format!("{self:?}"));

        web::HttpResponse::build(self.status_code()).json(&self.body())
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            ApiError::Validation(_) => http::StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) | ApiError::Internal(_) | ApiError::Provider { .. } => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

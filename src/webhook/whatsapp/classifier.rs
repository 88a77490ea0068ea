use super::schemas::WebhookEnvelope;
use crate::consts;
use derive_more::{Display, Error};
use serde::Deserialize;

#[derive(Debug, Display, Error)]
pub enum ClassifyError {
    #[display("invalid webhook envelope: {reason}")]
    InvalidEnvelope {
        #[error(not(source))]
        reason: String,
    },
}

/// Shape of an inbound webhook payload, selects the field table used for dispatch.
#[derive(Debug, Clone)]
pub enum WebhookShape {
    /// `object == "whatsapp_business_account"`
    BusinessAccount(WebhookEnvelope),
    /// Any other payload carrying an `entry` list (profile field updates)
    Legacy(WebhookEnvelope),
    Unrecognized,
}

impl WebhookShape {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookShape::BusinessAccount(_) => "business_account",
            WebhookShape::Legacy(_) => "legacy",
            WebhookShape::Unrecognized => "unrecognized",
        }
    }
}

/// Classifies a decoded webhook body.
///
/// Missing `entry` or `changes` collections are empty, not errors. Only a
/// recognised envelope whose structure cannot be decoded (e.g. `entry` is not
/// a list) fails.
pub fn classify(body: &serde_json::Value) -> Result<WebhookShape, ClassifyError> {
    let object = body.get("object").and_then(serde_json::Value::as_str);

    if object == Some(consts::BUSINESS_ACCOUNT_OBJECT) {
        return decode(body).map(WebhookShape::BusinessAccount);
    }

    if body.get("entry").is_some() {
        return decode(body).map(WebhookShape::Legacy);
    }

    Ok(WebhookShape::Unrecognized)
}

fn decode(body: &serde_json::Value) -> Result<WebhookEnvelope, ClassifyError> {
    WebhookEnvelope::deserialize(body).map_err(|e| ClassifyError::InvalidEnvelope {
        reason: e.to_string(),
    })
}

//! # WhatsApp Webhook Schemas
//!
//! This module contains the data structures for WhatsApp Business API webhooks.
//! These schemas define the JSON payload structure sent by WhatsApp when webhook
//! events occur (incoming messages, status updates, account events, etc.).
//!
//! Collections that the provider may omit (`entry`, `changes`, `messages`,
//! `statuses`) deserialize to empty vectors when absent or `null`. Messages and
//! statuses are kept as raw JSON inside a [`MessageBatch`] and decoded one by
//! one, so a single malformed item never invalidates its siblings.

use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treats a missing or `null` value as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Epoch timestamps come as strings, some senders use numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(value)) => Ok(value),
        Some(serde_json::Value::Number(value)) => Ok(value.to_string()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid timestamp: {other}"
        ))),
    }
}

/// Root webhook payload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookEnvelope {
    /// The object type, "whatsapp_business_account" for business webhooks
    #[serde(default, deserialize_with = "null_as_default")]
    pub object: String,
    /// Array of entry objects containing the actual data
    #[serde(default, deserialize_with = "null_as_default")]
    pub entry: Vec<Entry>,
}

/// Entry object containing changes
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Entry {
    /// Business Account ID (or user ID for legacy payloads)
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Array of changes that occurred
    #[serde(default, deserialize_with = "null_as_default")]
    pub changes: Vec<Change>,
}

/// Change object, `field` selects the handler and `value` its payload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Change {
    #[serde(default, deserialize_with = "null_as_default")]
    pub field: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Value of a `messages` change
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessageBatch {
    /// Messaging product (e.g., "whatsapp")
    #[serde(default)]
    pub messaging_product: Option<String>,
    /// Metadata about the phone number
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Array of contacts (senders)
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts: Vec<Contact>,
    /// Messages received, decoded lazily into [`InboundMessage`]
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<serde_json::Value>,
    /// Delivery updates, decoded lazily into [`StatusUpdate`]
    #[serde(default, deserialize_with = "null_as_default")]
    pub statuses: Vec<serde_json::Value>,
}

/// Metadata about the WhatsApp Business phone number
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub phone_number_id: String,
}

/// Contact information for the message sender
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default)]
    pub profile: Option<Profile>,
    /// WhatsApp ID (phone number)
    #[serde(default)]
    pub wa_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
}

/// Message type, the dispatch key inside a `messages` change.
///
/// The set is open: any value the provider adds later lands in
/// [`MessageKind::Unknown`] with the original string preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Text,
    Audio,
    Button,
    Contacts,
    Document,
    Image,
    Interactive,
    Location,
    Order,
    Reaction,
    Sticker,
    System,
    Video,
    Errors,
    Status,
    Unsupported,
    Unknown(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Audio => "audio",
            MessageKind::Button => "button",
            MessageKind::Contacts => "contacts",
            MessageKind::Document => "document",
            MessageKind::Image => "image",
            MessageKind::Interactive => "interactive",
            MessageKind::Location => "location",
            MessageKind::Order => "order",
            MessageKind::Reaction => "reaction",
            MessageKind::Sticker => "sticker",
            MessageKind::System => "system",
            MessageKind::Video => "video",
            MessageKind::Errors => "errors",
            MessageKind::Status => "status",
            MessageKind::Unsupported => "unsupported",
            MessageKind::Unknown(raw) => raw,
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Unknown(String::new())
    }
}

impl From<String> for MessageKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => MessageKind::Text,
            "audio" => MessageKind::Audio,
            "button" => MessageKind::Button,
            "contacts" => MessageKind::Contacts,
            "document" => MessageKind::Document,
            "image" => MessageKind::Image,
            "interactive" => MessageKind::Interactive,
            "location" => MessageKind::Location,
            "order" => MessageKind::Order,
            "reaction" => MessageKind::Reaction,
            "sticker" => MessageKind::Sticker,
            "system" => MessageKind::System,
            "video" => MessageKind::Video,
            "errors" => MessageKind::Errors,
            "status" => MessageKind::Status,
            "unsupported" => MessageKind::Unsupported,
            _ => MessageKind::Unknown(value),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound message, one item of [`MessageBatch::messages`]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InboundMessage {
    /// Message ID
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Sender's WhatsApp ID (phone number)
    #[serde(default, deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<MediaContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker: Option<MediaContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<ReactionContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<ButtonContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsupported: Option<serde_json::Value>,
    /// Context (if this is a reply to another message)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

impl InboundMessage {
    /// Text body, when the message carries a non-blank one
    pub fn text_body(&self) -> Option<&str> {
        self.text
            .as_ref()
            .map(|text| text.body.as_str())
            .filter(|body| !body.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: String,
}

/// Media message content (audio, image, video, document, sticker)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MediaContent {
    /// Media ID
    #[serde(default)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Document filename
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Only set for stickers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationContent {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReactionContent {
    /// ID of the message reacted to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Empty when a reaction is removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// Quick reply button pressed on a template message
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ButtonContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Cart sent from a catalog (message type `order`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrderPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    /// Free text sent along with the order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_items: Vec<ProductItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductItem {
    #[serde(default)]
    pub product_retailer_id: String,
    pub quantity: u32,
    pub item_price: Decimal,
    #[serde(default)]
    pub currency: String,
}

/// Context for reply messages
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Context {
    /// Sender of the message being replied to
    #[serde(default)]
    pub from: String,
    /// Message ID being referenced
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Display)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[display("sent")]
    Sent,
    #[display("delivered")]
    Delivered,
    #[display("read")]
    Read,
    #[display("failed")]
    Failed,
    // Statuses the provider may add later (e.g. "deleted")
    #[default]
    #[serde(other)]
    #[display("other")]
    Other,
}

/// Status update for sent messages, one item of [`MessageBatch::statuses`]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusUpdate {
    /// Message ID
    pub id: String,
    pub status: DeliveryStatus,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: String,
    #[serde(default)]
    pub recipient_id: String,
    /// Error details for failed deliveries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

/// Value of a `business_capability_update` change
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BusinessCapabilityUpdate {
    pub max_daily_conversation_per_phone: Option<serde_json::Value>,
    pub max_phone_numbers_per_waba: Option<serde_json::Value>,
}

/// Value of `message_template_quality_update` and `message_template_status_update`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateUpdate {
    pub message_template_id: Option<serde_json::Value>,
    pub message_template_name: Option<String>,
    pub message_template_language: Option<String>,
    pub previous_quality_score: Option<String>,
    pub new_quality_score: Option<String>,
    pub event: Option<String>,
    pub reason: Option<String>,
}

/// Value of `phone_number_name_update`, `phone_number_quality_update` and `security`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhoneNumberEvent {
    pub display_phone_number: Option<String>,
    pub decision: Option<String>,
    pub requested_verified_name: Option<String>,
    pub event: Option<String>,
    pub old_limit: Option<String>,
    pub current_limit: Option<String>,
    pub requester: Option<String>,
}

/// Value of `account_review_update` and `account_update`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountEvent {
    pub phone_number: Option<String>,
    pub decision: Option<String>,
    pub event: Option<String>,
    pub ban_info: Option<BanInfo>,
    pub business_verification_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BanInfo {
    pub waba_ban_state: Option<String>,
    pub waba_ban_date: Option<String>,
}

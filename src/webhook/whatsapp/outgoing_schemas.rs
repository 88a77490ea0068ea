//! # WhatsApp Outgoing Message Schemas
//!
//! This module contains data structures for sending messages and managing
//! templates through the WhatsApp Business API.

use crate::consts;
use serde::{Deserialize, Serialize};

/// Message envelope posted to `/{phone_number_id}/messages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Messaging product, always "whatsapp"
    pub messaging_product: String,
    /// Recipient's WhatsApp ID (phone number)
    pub to: String,
    /// `type` plus the matching body
    #[serde(flatten)]
    pub content: OutgoingContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingContent {
    Text { text: OutgoingTextContent },
    Template { template: OutgoingTemplateContent },
}

impl OutgoingMessage {
    /// Creates a new text message
    pub fn text(to: String, body: String) -> Self {
        Self {
            messaging_product: consts::MESSAGING_PRODUCT.to_string(),
            to,
            content: OutgoingContent::Text {
                text: OutgoingTextContent { body },
            },
        }
    }

    /// Creates a new template message
    pub fn template(
        to: String,
        name: String,
        language: String,
        components: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            messaging_product: consts::MESSAGING_PRODUCT.to_string(),
            to,
            content: OutgoingContent::Template {
                template: OutgoingTemplateContent {
                    name,
                    language: TemplateLanguage { code: language },
                    components,
                },
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.content {
            OutgoingContent::Text { .. } => "text",
            OutgoingContent::Template { .. } => "template",
        }
    }
}

/// Text content for outgoing messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingTextContent {
    /// Message body text
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingTemplateContent {
    /// Approved template name
    pub name: String,
    pub language: TemplateLanguage,
    /// Parameters for the template header, body and buttons
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLanguage {
    /// Locale code, e.g. "en_US"
    pub code: String,
}

/// Template definition posted to `/{business_account_id}/message_templates`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub name: String,
    /// AUTHENTICATION, MARKETING or UTILITY
    pub category: String,
    pub language: String,
    /// HEADER, BODY, FOOTER and BUTTONS components
    pub components: Vec<serde_json::Value>,
}

use crate::{
    errors::ProviderError,
    webhook::whatsapp::outgoing_schemas::{OutgoingMessage, TemplateDefinition},
};
use async_trait::async_trait;

/// Remote messaging API: outbound messages and template management.
///
/// Responses are the provider's JSON, passed through untouched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingApi {
    async fn send_message(
        &self,
        message: &OutgoingMessage,
    ) -> Result<serde_json::Value, ProviderError>;

    async fn list_templates(&self) -> Result<serde_json::Value, ProviderError>;

    async fn get_template(&self, name: String) -> Result<serde_json::Value, ProviderError>;

    async fn create_template(
        &self,
        template: &TemplateDefinition,
    ) -> Result<serde_json::Value, ProviderError>;

    async fn delete_template(&self, name: String) -> Result<serde_json::Value, ProviderError>;
}

pub type ImplMessagingApi = Box<dyn MessagingApi>;

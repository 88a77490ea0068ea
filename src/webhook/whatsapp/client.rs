//! # WhatsApp API Client
//!
//! This module provides a client for the WhatsApp Business (Graph) API.
//! It handles authentication, message sending and template management.

use super::outgoing_schemas::{OutgoingMessage, TemplateDefinition};
use crate::{config::AppConfig, errors::ProviderError, services::MessagingApi};
use async_trait::async_trait;

/// WhatsApp API client for sending messages and managing templates
pub struct WhatsAppClient {
    /// HTTP client for making API requests
    client: reqwest::Client,
    /// `/{phone_number_id}/messages`, `None` when the phone number id is unset
    send_msg_endpoint: Option<String>,
    /// `/{business_account_id}/message_templates`, `None` when the account id is unset
    templates_endpoint: Option<String>,
    /// Authentication token
    auth_token: Option<String>,
}

impl WhatsAppClient {
    /// Creates a new WhatsApp client.
    ///
    /// Missing credentials are reported when a call needs them.
    pub fn new(app_config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            send_msg_endpoint: app_config.send_msg_endpoint(),
            templates_endpoint: app_config.templates_endpoint(),
            auth_token: app_config.access_token().map(str::to_string),
        }
    }

    fn auth_token(&self) -> Result<&str, ProviderError> {
        self.auth_token
            .as_deref()
            .ok_or(ProviderError::MissingCredentials("WHATSAPP_ACCESS_TOKEN"))
    }

    fn send_msg_endpoint(&self) -> Result<&str, ProviderError> {
        self.send_msg_endpoint
            .as_deref()
            .ok_or(ProviderError::MissingCredentials("PHONE_NUMBER_ID"))
    }

    fn templates_endpoint(&self) -> Result<&str, ProviderError> {
        self.templates_endpoint
            .as_deref()
            .ok_or(ProviderError::MissingCredentials("WHATSAPP_BUSINESS_ACCOUNT_ID"))
    }

    /// Sends the request with the bearer token and decodes the JSON answer.
    ///
    /// Non-2xx answers become [`ProviderError::Rejected`] carrying the
    /// provider's body (JSON when it parses, raw text otherwise).
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = request
            .bearer_auth(self.auth_token()?)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(ProviderError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ProviderError::Transport)?;

        if !status.is_success() {
            let details = serde_json::from_str::<serde_json::Value>(&body)
                .unwrap_or(serde_json::Value::String(body));
            let message = details
                .pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());

            logfire::error!(
                "WhatsApp API error {status}: {details}",
                status = status.as_u16() as i64,
                details = details.to_string()
            );

            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
                details,
            });
        }

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MessagingApi for WhatsAppClient {
    async fn send_message(
        &self,
        message: &OutgoingMessage,
    ) -> Result<serde_json::Value, ProviderError> {
        let endpoint = self.send_msg_endpoint()?;
        let response = self.execute(self.client.post(endpoint).json(message)).await?;

        logfire::info!(
            "Message sent successfully: type={kind}, to={to}",
            kind = message.kind(),
            to = message.to.clone()
        );

        Ok(response)
    }

    async fn list_templates(&self) -> Result<serde_json::Value, ProviderError> {
        let endpoint = self.templates_endpoint()?;
        self.execute(self.client.get(endpoint)).await
    }

    async fn get_template(&self, name: String) -> Result<serde_json::Value, ProviderError> {
        let endpoint = format!("{}/{}", self.templates_endpoint()?, name);
        self.execute(self.client.get(endpoint)).await
    }

    async fn create_template(
        &self,
        template: &TemplateDefinition,
    ) -> Result<serde_json::Value, ProviderError> {
        let endpoint = self.templates_endpoint()?;
        self.execute(self.client.post(endpoint).json(template)).await
    }

    async fn delete_template(&self, name: String) -> Result<serde_json::Value, ProviderError> {
        let endpoint = self.templates_endpoint()?;
        self.execute(self.client.delete(endpoint).query(&[("name", name)]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WhatsAppClient {
        let mut config = AppConfig::for_tests();
        config.graph_api_url = server.uri();
        WhatsAppClient::new(&config)
    }

    #[tokio::test]
    async fn test_send_text_message() {
        let server = MockServer::start().await;
        let provider_response = json!({
            "messaging_product": "whatsapp",
            "contacts": [{"input": "5511999999999", "wa_id": "5511999999999"}],
            "messages": [{"id": "wamid.HBgL"}]
        });

        Mock::given(method("POST"))
            .and(path("/1234/messages"))
            .and(header("authorization", "Bearer access"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "5511999999999",
                "type": "text",
                "text": {"body": "hi"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(provider_response.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let message = OutgoingMessage::text("5511999999999".into(), "hi".into());
        let result = client_for(&server).send_message(&message).await.unwrap();

        assert_eq!(result, provider_response);
    }

    #[tokio::test]
    async fn test_rejected_request_keeps_provider_details() {
        let server = MockServer::start().await;
        let error_body = json!({
            "error": {"message": "(#131030) Recipient phone number not in allowed list", "code": 131030}
        });

        Mock::given(method("POST"))
            .and(path("/1234/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_body.clone()))
            .mount(&server)
            .await;

        let message = OutgoingMessage::text("1".into(), "hi".into());
        let err = client_for(&server).send_message(&message).await.unwrap_err();

        match err {
            ProviderError::Rejected {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 400);
                assert_eq!(
                    message,
                    "(#131030) Recipient phone number not in allowed list"
                );
                assert_eq!(details, error_body);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_request_with_text_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/5678/message_templates"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_templates().await.unwrap_err();

        assert!(matches!(
            err,
            ProviderError::Rejected { status: 502, ref details, .. } if details == &json!("Bad Gateway")
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let mut config = AppConfig::for_tests();
        config.access_token = None;
        config.business_account_id = Some("".into());
        let client = WhatsAppClient::new(&config);

        let message = OutgoingMessage::text("1".into(), "hi".into());
        assert!(matches!(
            client.send_message(&message).await,
            Err(ProviderError::MissingCredentials("WHATSAPP_ACCESS_TOKEN"))
        ));
        assert!(matches!(
            client.list_templates().await,
            Err(ProviderError::MissingCredentials("WHATSAPP_BUSINESS_ACCOUNT_ID"))
        ));
    }

    #[tokio::test]
    async fn test_template_management_endpoints() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/5678/message_templates/welcome_message"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "welcome_message"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/5678/message_templates"))
            .and(query_param("name", "welcome_message"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/5678/message_templates"))
            .and(body_json(json!({
                "name": "welcome_message",
                "category": "UTILITY",
                "language": "en_US",
                "components": [{"type": "BODY", "text": "Hello {{1}}"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "99", "status": "PENDING"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);

        let template = client.get_template("welcome_message".into()).await.unwrap();
        assert_eq!(template["name"], "welcome_message");

        let deleted = client.delete_template("welcome_message".into()).await.unwrap();
        assert_eq!(deleted["success"], true);

        let created = client
            .create_template(&TemplateDefinition {
                name: "welcome_message".into(),
                category: "UTILITY".into(),
                language: "en_US".into(),
                components: vec![json!({"type": "BODY", "text": "Hello {{1}}"})],
            })
            .await
            .unwrap();
        assert_eq!(created["status"], "PENDING");
    }
}

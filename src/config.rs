//! Application configuration loaded from the environment.
//!
//! The configuration is read once at process start and handed to the web
//! workers by value, so handlers never read ambient environment state.
//!
//! # Security Notes
//! - Sensitive fields are clearly marked and should never be logged
//! - Missing credentials are not a startup failure: the endpoints that need
//!   them answer with a configuration error instead

use crate::consts;
use envconfig::Envconfig;

/// Relay configuration.
///
/// Credential fields are optional; an unset or empty value is treated as
/// "not configured".
#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(from = "ENV", default = "local")]
    pub env: String,

    /// Port for web server binding (NON-SENSITIVE)
    #[envconfig(from = "PORT", default = "3000")]
    pub port: u16,

    /// Public base URL of this service (NON-SENSITIVE)
    /// Example: "https://relay.example.com"
    #[envconfig(from = "API_URL", default = "http://localhost:3000")]
    pub api_url: String,

    /// 🔒 SENSITIVE: secret echoed by the provider during the webhook handshake
    #[envconfig(from = "TOKEN")]
    pub verify_token: Option<String>,

    /// 🔒 SENSITIVE: WhatsApp Business authentication token
    #[envconfig(from = "WHATSAPP_ACCESS_TOKEN")]
    pub access_token: Option<String>,

    /// WhatsApp Business phone number ID (SEMI-SENSITIVE)
    #[envconfig(from = "PHONE_NUMBER_ID")]
    pub phone_number_id: Option<String>,

    /// WhatsApp Business account ID owning the message templates (SEMI-SENSITIVE)
    #[envconfig(from = "WHATSAPP_BUSINESS_ACCOUNT_ID")]
    pub business_account_id: Option<String>,

    /// Graph API base URL including the version segment (NON-SENSITIVE)
    #[envconfig(from = "GRAPH_API_URL", default = "https://graph.facebook.com/v23.0")]
    pub graph_api_url: String,

    /// Answer inbound text messages with an automatic reply
    #[envconfig(from = "AUTO_REPLY", default = "false")]
    pub auto_reply: bool,

    /// Pause between deleting and creating a template on recreate
    #[envconfig(from = "TEMPLATE_RECREATE_DELAY_MS", default = "2000")]
    pub template_recreate_delay_ms: u64,

    /// 🔒 SENSITIVE: Logfire write token, console-only logging when unset
    #[envconfig(from = "LOGFIRE_TOKEN")]
    pub logfire_token: Option<String>,
}

/// Returns the value only when it is present and not blank.
fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn verify_token(&self) -> Option<&str> {
        configured(&self.verify_token)
    }

    pub fn access_token(&self) -> Option<&str> {
        configured(&self.access_token)
    }

    pub fn phone_number_id(&self) -> Option<&str> {
        configured(&self.phone_number_id)
    }

    pub fn business_account_id(&self) -> Option<&str> {
        configured(&self.business_account_id)
    }

    pub fn logfire_token(&self) -> Option<&str> {
        configured(&self.logfire_token)
    }

    /// Constructs the WhatsApp Business API endpoint for sending messages
    pub fn send_msg_endpoint(&self) -> Option<String> {
        self.phone_number_id().map(|id| {
            format!(
                "{base}/{id}/messages",
                base = self.graph_api_url.trim_end_matches('/')
            )
        })
    }

    /// Constructs the template collection endpoint of the business account
    pub fn templates_endpoint(&self) -> Option<String> {
        self.business_account_id().map(|id| {
            format!(
                "{base}/{id}/{path}",
                base = self.graph_api_url.trim_end_matches('/'),
                path = consts::TEMPLATES_PATH
            )
        })
    }
}

#[cfg(test)]
impl AppConfig {
    /// Fully configured instance used across the test modules.
    pub fn for_tests() -> Self {
        Self {
            env: "local".into(),
            port: 3000,
            api_url: "http://localhost:3000".into(),
            verify_token: Some("right".into()),
            access_token: Some("access".into()),
            phone_number_id: Some("1234".into()),
            business_account_id: Some("5678".into()),
            graph_api_url: "https://graph.facebook.com/v23.0".into(),
            auto_reply: false,
            template_recreate_delay_ms: 0,
            logfire_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_not_configured() {
        let mut config = AppConfig::for_tests();
        config.verify_token = Some("   ".into());
        config.access_token = None;

        assert_eq!(config.verify_token(), None);
        assert_eq!(config.access_token(), None);
        assert_eq!(config.phone_number_id(), Some("1234"));
    }

    #[test]
    fn test_endpoints() {
        let mut config = AppConfig::for_tests();
        config.graph_api_url = "http://localhost:9000/".into();

        assert_eq!(
            config.send_msg_endpoint().as_deref(),
            Some("http://localhost:9000/1234/messages")
        );
        assert_eq!(
            config.templates_endpoint().as_deref(),
            Some("http://localhost:9000/5678/message_templates")
        );

        config.business_account_id = None;
        assert!(config.templates_endpoint().is_none());
    }

    #[test]
    fn test_init_from_hashmap_defaults() {
        let env = std::collections::HashMap::from([("TOKEN".to_string(), "secret".to_string())]);
        let config = AppConfig::init_from_hashmap(&env).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.verify_token(), Some("secret"));
        assert!(config.access_token().is_none());
        assert!(!config.auto_reply);
        assert_eq!(config.env, "local");
    }
}

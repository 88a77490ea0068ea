pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";
pub const MESSAGING_PRODUCT: &str = "whatsapp";
pub const SUBSCRIBE_MODE: &str = "subscribe";

pub const TEMPLATES_PATH: &str = "message_templates";
pub const HELLO_WORLD_TEMPLATE: &str = "hello_world";
pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "en_US";

/// Currency reported for an order without product items.
pub const DEFAULT_ORDER_CURRENCY: &str = "USD";

pub const AUTO_REPLY_TEMPLATE: &str = "Olá! Recebi sua mensagem: \"{body}\". Como posso ajudar?";

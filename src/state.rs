use crate::{config::AppConfig, services};

/// Per-worker state shared by every handler
pub struct AppState {
    pub config: AppConfig,
    pub messaging_api: services::ImplMessagingApi,
}

impl AppState {
    /// Client used for automatic replies, `None` while `AUTO_REPLY` is off
    pub fn auto_reply_client(&self) -> Option<&dyn services::MessagingApi> {
        self.config
            .auto_reply
            .then_some(self.messaging_api.as_ref())
    }
}

//! # API Module
//!
//! Outbound side of the relay: REST endpoints that call the WhatsApp Graph API.
//!
//! ## Modules
//!
//! - [`messaging`] - text and template messages, order processing smoke test
//! - [`templates`] - message template management
//! - [`routes`] - route configuration and the health probe

pub mod messaging;
pub mod routes;
pub mod templates;

//! Inbound webhooks
//!
//! - [`whatsapp`] - WhatsApp Business API webhook: verification, classification
//!   and dispatch of the delivered events

pub mod routes;
pub mod whatsapp;

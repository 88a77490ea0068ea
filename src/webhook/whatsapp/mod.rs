//! WhatsApp webhook integration module
//!
//! ## Submodules
//!
//! - [`verification`] - `hub.*` handshake check
//! - [`classifier`] - payload shape detection
//! - [`fields`] - per-field dispatch of change records
//! - [`messages`] - per-type dispatch of inbound messages and statuses
//! - [`order`] - order totals
//! - [`handler`] - classify then dispatch, shared by every route
//! - [`routes`] - HTTP endpoint handlers
//! - [`schemas`] / [`outgoing_schemas`] - inbound and outbound payloads
//! - [`client`] - WhatsApp Graph API client

pub mod classifier;
pub mod client;
pub mod fields;
pub mod handler;
pub mod messages;
pub mod order;
pub mod outgoing_schemas;
pub mod routes;
pub mod schemas;
pub mod verification;

pub use routes::{receive, verify};

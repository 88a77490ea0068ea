//! # WhatsApp Webhook Relay
//!
//! Main entry point: receives WhatsApp Business webhooks, dispatches the
//! delivered events to their handlers and exposes a few outbound endpoints
//! (messages and templates) backed by the Graph API.

pub mod api;
pub mod config;
pub mod consts;
pub mod errors;
pub mod metric;
pub mod services;
pub mod state;
pub mod webhook;

use envconfig::Envconfig;
use logfire::config::{MetricsOptions, SendToLogfire};
use ntex::web;

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration once, every worker gets its own copy
    let app_config = config::AppConfig::init_from_env()?;

    // Initialize logging and metrics
    let mut logfire_config = logfire::configure()
        .install_panic_handler()
        .with_metrics(Some(MetricsOptions::default()))
        .send_to_logfire(SendToLogfire::IfTokenPresent);
    if let Some(token) = app_config.logfire_token() {
        logfire_config = logfire_config.with_token(token);
    }
    let shutdown_handler = logfire_config.finish()?;

    log_startup(&app_config);

    configure_and_run_server(app_config).await?;

    shutdown_handler.shutdown()?;

    Ok(())
}

fn log_startup(app_config: &config::AppConfig) {
    logfire::info!(
        "WhatsApp webhook ready on port {port}, public url {api_url}, env {env}",
        port = app_config.port as i64,
        api_url = app_config.api_url.clone(),
        env = app_config.env.clone()
    );

    for (name, configured) in [
        ("TOKEN", app_config.verify_token().is_some()),
        ("WHATSAPP_ACCESS_TOKEN", app_config.access_token().is_some()),
        ("PHONE_NUMBER_ID", app_config.phone_number_id().is_some()),
        (
            "WHATSAPP_BUSINESS_ACCOUNT_ID",
            app_config.business_account_id().is_some(),
        ),
    ] {
        if !configured {
            logfire::warn!("{name} is not configured", name = name);
        }
    }
}

/// Creates the per-worker application state
fn create_app_state(app_config: config::AppConfig) -> state::AppState {
    let client = webhook::whatsapp::client::WhatsAppClient::new(&app_config);

    state::AppState {
        config: app_config,
        messaging_api: Box::new(client),
    }
}

/// Configures and starts the web server
async fn configure_and_run_server(app_config: config::AppConfig) -> anyhow::Result<()> {
    let server_addr = ("0.0.0.0", app_config.port);

    web::server(move || {
        web::App::new()
            .wrap(web::middleware::Logger::default())
            .wrap(web::middleware::Compress::default())
            .state(create_app_state(app_config.clone()))
            .configure(api::routes::messaging)
            .configure(api::routes::templates)
            .service(api::routes::health)
            .configure(webhook::routes::whatsapp)
    })
    .bind(server_addr)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

//! # Messaging API Module
//!
//! Outbound messages (text, template, the `hello_world` sample) and the
//! order processing smoke test.

use crate::{
    consts,
    errors::ApiError,
    metric,
    services::MessagingApi,
    state::AppState,
    webhook::whatsapp::{
        messages::{MessageDispatcher, MessageOutcome},
        outgoing_schemas::OutgoingMessage,
        schemas::{InboundMessage, MessageKind, OrderPayload, ProductItem},
    },
};
use ntex::web;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Body of `POST /send-message`.
///
/// `message` is either a plain string (text body) or an object:
/// `{"text": ...}` for text, `{"template_name", "language_code"}` for templates.
#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendHelloWorldRequest {
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendTemplateRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub components: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOrderResult {
    pub message: String,
    pub order_id: String,
    pub total_items: usize,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    present(value.get(key).and_then(serde_json::Value::as_str))
}

/// Builds the provider envelope for a `POST /send-message` body.
pub fn build_message(request: &SendMessageRequest) -> Result<OutgoingMessage, ApiError> {
    let to = present(request.to.as_deref());
    let message = request.message.as_ref().filter(|message| match message {
        serde_json::Value::Null => false,
        serde_json::Value::String(body) => !body.trim().is_empty(),
        _ => true,
    });

    let (Some(to), Some(message)) = (to, message) else {
        return Err(ApiError::Validation(
            "Missing required fields: to, message".into(),
        ));
    };

    match present(request.kind.as_deref()).unwrap_or("text") {
        "text" => {
            let body = match message {
                serde_json::Value::String(body) => Some(body.as_str()),
                other => str_field(other, "text"),
            }
            .ok_or_else(|| ApiError::Validation("Missing required field: message.text".into()))?;

            Ok(OutgoingMessage::text(to.to_string(), body.to_string()))
        }
        "template" => Ok(OutgoingMessage::template(
            to.to_string(),
            str_field(message, "template_name")
                .unwrap_or(consts::HELLO_WORLD_TEMPLATE)
                .to_string(),
            str_field(message, "language_code")
                .unwrap_or(consts::DEFAULT_TEMPLATE_LANGUAGE)
                .to_string(),
            vec![],
        )),
        other => Err(ApiError::Validation(format!(
            "Unsupported message type: {other}"
        ))),
    }
}

pub async fn send_message(
    api: &dyn MessagingApi,
    request: &SendMessageRequest,
) -> Result<serde_json::Value, ApiError> {
    let message = build_message(request)?;
    metric::incr_outbound_statds("send_message");

    api.send_message(&message)
        .await
        .map_err(|e| ApiError::from_provider("Failed to send message", e))
}

pub async fn send_hello_world(
    api: &dyn MessagingApi,
    to: Option<&str>,
) -> Result<serde_json::Value, ApiError> {
    let to = present(to)
        .ok_or_else(|| ApiError::Validation("Missing required field: to".into()))?;

    let message = OutgoingMessage::template(
        to.to_string(),
        consts::HELLO_WORLD_TEMPLATE.to_string(),
        consts::DEFAULT_TEMPLATE_LANGUAGE.to_string(),
        vec![],
    );
    metric::incr_outbound_statds("send_hello_world");

    api.send_message(&message)
        .await
        .map_err(|e| ApiError::from_provider("Failed to send template", e))
}

pub async fn send_template(
    api: &dyn MessagingApi,
    request: &SendTemplateRequest,
) -> Result<serde_json::Value, ApiError> {
    let (Some(to), Some(template_name)) = (
        present(request.to.as_deref()),
        present(request.template_name.as_deref()),
    ) else {
        return Err(ApiError::Validation(
            "Missing required fields: to, template_name".into(),
        ));
    };

    let message = OutgoingMessage::template(
        to.to_string(),
        template_name.to_string(),
        present(request.language.as_deref())
            .unwrap_or(consts::DEFAULT_TEMPLATE_LANGUAGE)
            .to_string(),
        request.components.clone().unwrap_or_default(),
    );
    metric::incr_outbound_statds("send_template");

    api.send_message(&message)
        .await
        .map_err(|e| ApiError::from_provider("Failed to send template message", e))
}

/// Fixed order used by `POST /test-order`
fn sample_order_message() -> InboundMessage {
    let item = |id: &str, quantity, item_price| ProductItem {
        product_retailer_id: id.to_string(),
        quantity,
        item_price,
        currency: consts::DEFAULT_ORDER_CURRENCY.to_string(),
    };

    InboundMessage {
        id: "wamid.test123".into(),
        from: "16505551234".into(),
        timestamp: chrono::Utc::now().timestamp().to_string(),
        kind: MessageKind::Order,
        order: Some(OrderPayload {
            catalog_id: Some("194836987003835".into()),
            text: Some("Love these!".into()),
            product_items: vec![item("di9ozbzfi4", 2, dec!(30)), item("nqryix03ez", 1, dec!(25))],
        }),
        ..Default::default()
    }
}

/// Runs the sample order through the message dispatcher.
pub async fn run_test_order() -> Result<TestOrderResult, ApiError> {
    let message = sample_order_message();
    logfire::info!("Testing order processing with mock data");

    match MessageDispatcher::default().handle(&message).await {
        Ok(MessageOutcome::Order(summary)) => Ok(TestOrderResult {
            message: "Order processing test completed".into(),
            order_id: message.id.clone(),
            total_items: summary.item_count,
        }),
        Ok(other) => Err(ApiError::Internal(format!(
            "Failed to test order processing: unexpected outcome {other:?}"
        ))),
        Err(e) => Err(ApiError::Internal(format!(
            "Failed to test order processing: {e}"
        ))),
    }
}

#[web::post("/send-message")]
pub async fn send_message_view(
    body: Result<web::types::Json<SendMessageRequest>, web::error::JsonPayloadError>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.map_err(ApiError::from)?;
    let data = send_message(app_state.messaging_api.as_ref(), &body).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "message": "Message sent successfully",
        "data": data,
    })))
}

#[web::post("/send-hello-world")]
pub async fn send_hello_world_view(
    body: Result<web::types::Json<SendHelloWorldRequest>, web::error::JsonPayloadError>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.map_err(ApiError::from)?;
    let data = send_hello_world(app_state.messaging_api.as_ref(), body.to.as_deref()).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "message": "Template sent successfully",
        "data": data,
    })))
}

#[web::post("/send-template")]
pub async fn send_template_view(
    body: Result<web::types::Json<SendTemplateRequest>, web::error::JsonPayloadError>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.map_err(ApiError::from)?;
    let data = send_template(app_state.messaging_api.as_ref(), &body).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "message": "Template message sent successfully",
        "data": data,
    })))
}

#[web::post("/test-order")]
pub async fn test_order_view() -> Result<impl web::Responder, web::Error> {
    let result = run_test_order().await?;

    Ok(web::HttpResponse::Ok().json(&result))
}

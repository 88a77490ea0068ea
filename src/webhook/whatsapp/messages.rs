//! # Message Dispatcher
//!
//! Handles the value of a `messages` change: every inbound message is routed
//! by its [`MessageKind`] and every delivery status is logged. Items are
//! handled one after the other in source order; an auto-reply is awaited
//! before the next message starts. A message that fails to decode or to be
//! handled is logged and recorded in the [`BatchReport`], its siblings are
//! still processed.

use super::{
    handler::DispatchError,
    order::{self, OrderSummary},
    outgoing_schemas::OutgoingMessage,
    schemas::{InboundMessage, MediaContent, MessageBatch, MessageKind, StatusUpdate},
};
use crate::{consts, metric, services::MessagingApi};

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Logged by its type handler
    Logged,
    /// Text message answered with an automatic reply
    Replied,
    /// Text message whose automatic reply could not be sent
    ReplyFailed(String),
    /// Order message with its computed totals
    Order(OrderSummary),
    /// Routed to the fallback handler, original type preserved
    Unknown(String),
    /// Decoding or handling failed
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandledMessage {
    pub id: String,
    pub kind: MessageKind,
    pub outcome: MessageOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub messages: Vec<HandledMessage>,
    pub statuses_logged: usize,
    pub statuses_rejected: usize,
}

/// Routes the messages of a batch to their type handlers.
#[derive(Default)]
pub struct MessageDispatcher<'a> {
    /// Client used for automatic replies, `None` disables them
    auto_reply: Option<&'a dyn MessagingApi>,
}

impl<'a> MessageDispatcher<'a> {
    pub fn new(auto_reply: Option<&'a dyn MessagingApi>) -> Self {
        Self { auto_reply }
    }

    /// Handles all messages and statuses of the batch in order.
    pub async fn dispatch_messages(&self, batch: &MessageBatch) -> BatchReport {
        let mut report = BatchReport::default();

        if let Some(metadata) = &batch.metadata {
            logfire::debug!(
                "Message batch for {phone}: {messages} messages, {statuses} statuses",
                phone = metadata.display_phone_number.clone(),
                messages = batch.messages.len() as i64,
                statuses = batch.statuses.len() as i64
            );
        }

        for raw in &batch.messages {
            report.messages.push(self.dispatch_raw(raw).await);
        }

        for raw in &batch.statuses {
            match serde_json::from_value::<StatusUpdate>(raw.clone()) {
                Ok(status) => {
                    log_status(&status);
                    report.statuses_logged += 1;
                }
                Err(e) => {
                    let err = DispatchError::Malformed {
                        what: "status",
                        reason: e.to_string(),
                    };
                    logfire::error!("Failed to handle status: {error}", error = err.to_string());
                    report.statuses_rejected += 1;
                }
            }
        }

        report
    }

    async fn dispatch_raw(&self, raw: &serde_json::Value) -> HandledMessage {
        let message = match serde_json::from_value::<InboundMessage>(raw.clone()) {
            Ok(message) => message,
            Err(e) => {
                let err = DispatchError::Malformed {
                    what: "message",
                    reason: e.to_string(),
                };
                logfire::error!("Failed to handle message: {error}", error = err.to_string());

                let field = |name: &str| {
                    raw.get(name)
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                return HandledMessage {
                    id: field("id"),
                    kind: MessageKind::from(field("type")),
                    outcome: MessageOutcome::Failed(err.to_string()),
                };
            }
        };

        metric::incr_message_type_statds(message.kind.as_str());

        let outcome = match self.handle(&message).await {
            Ok(outcome) => outcome,
            Err(err) => {
                logfire::error!(
                    "Failed to handle message {id}: {error}",
                    id = message.id.clone(),
                    error = err.to_string()
                );
                MessageOutcome::Failed(err.to_string())
            }
        };

        HandledMessage {
            id: message.id,
            kind: message.kind,
            outcome,
        }
    }

    /// Handler table keyed by message type.
    pub async fn handle(&self, message: &InboundMessage) -> Result<MessageOutcome, DispatchError> {
        match &message.kind {
            MessageKind::Text => Ok(self.on_text(message).await),
            MessageKind::Audio => Ok(on_media(message, message.audio.as_ref())),
            MessageKind::Image => Ok(on_media(message, message.image.as_ref())),
            MessageKind::Video => Ok(on_media(message, message.video.as_ref())),
            MessageKind::Document => Ok(on_media(message, message.document.as_ref())),
            MessageKind::Sticker => Ok(on_media(message, message.sticker.as_ref())),
            MessageKind::Button => Ok(on_button(message)),
            MessageKind::Contacts => Ok(on_raw(message, "contacts", message.contacts.as_ref())),
            MessageKind::Interactive => Ok(on_interactive(message)),
            MessageKind::Location => Ok(on_location(message)),
            MessageKind::Order => on_order(message),
            MessageKind::Reaction => Ok(on_reaction(message)),
            MessageKind::System => Ok(on_raw(message, "system", message.system.as_ref())),
            MessageKind::Errors => Ok(on_raw(message, "errors", message.errors.as_ref())),
            MessageKind::Status => Ok(on_raw(message, "status", message.status.as_ref())),
            MessageKind::Unsupported => Ok(on_raw(
                message,
                "unsupported",
                message.unsupported.as_ref(),
            )),
            MessageKind::Unknown(raw) => Ok(on_unknown(message, raw)),
        }
    }

    async fn on_text(&self, message: &InboundMessage) -> MessageOutcome {
        logfire::info!(
            "Text message from {from} at {timestamp}: {body}",
            from = message.from.clone(),
            body = message
                .text
                .as_ref()
                .map(|text| text.body.clone())
                .unwrap_or_default(),
            timestamp = message.timestamp.clone()
        );

        let (Some(client), Some(body)) = (self.auto_reply, message.text_body()) else {
            return MessageOutcome::Logged;
        };
        if message.from.is_empty() {
            logfire::warn!("Text message {id} has no sender, no auto-reply", id = message.id.clone());
            return MessageOutcome::Logged;
        }

        let reply = OutgoingMessage::text(message.from.clone(), auto_reply_text(body));
        match client.send_message(&reply).await {
            Ok(_) => MessageOutcome::Replied,
            Err(e) => {
                logfire::error!(
                    "Failed to send auto-reply to {to}: {error}",
                    to = message.from.clone(),
                    error = e.to_string()
                );
                MessageOutcome::ReplyFailed(e.to_string())
            }
        }
    }
}

pub fn auto_reply_text(body: &str) -> String {
    consts::AUTO_REPLY_TEMPLATE.replace("{body}", body)
}

fn on_media(message: &InboundMessage, media: Option<&MediaContent>) -> MessageOutcome {
    let media = media.cloned().unwrap_or_default();
    logfire::info!(
        "{kind} message from {from}: media_id={media_id}, mime_type={mime_type}, sha256={sha256}, caption={caption}, filename={filename}, animated={animated}",
        kind = message.kind.to_string(),
        from = message.from.clone(),
        media_id = media.id,
        mime_type = media.mime_type.unwrap_or_default(),
        sha256 = media.sha256.unwrap_or_default(),
        caption = media.caption.unwrap_or_default(),
        filename = media.filename.unwrap_or_default(),
        animated = media.animated.unwrap_or_default()
    );
    MessageOutcome::Logged
}

fn on_button(message: &InboundMessage) -> MessageOutcome {
    let button = message.button.clone().unwrap_or_default();
    logfire::info!(
        "Button message from {from}: text={text}, payload={payload}",
        from = message.from.clone(),
        text = button.text.unwrap_or_default(),
        payload = button.payload.unwrap_or_default()
    );
    MessageOutcome::Logged
}

fn on_interactive(message: &InboundMessage) -> MessageOutcome {
    let interactive_type = message
        .interactive
        .as_ref()
        .and_then(|interactive| interactive.get("type"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();

    logfire::info!(
        "Interactive message from {from}: type={interactive_type}, data={data}",
        from = message.from.clone(),
        interactive_type = interactive_type.to_string(),
        data = message
            .interactive
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    );
    MessageOutcome::Logged
}

fn on_location(message: &InboundMessage) -> MessageOutcome {
    match &message.location {
        Some(location) => logfire::info!(
            "Location message from {from}: ({latitude}, {longitude}) name={name}, address={address}",
            from = message.from.clone(),
            latitude = location.latitude,
            longitude = location.longitude,
            name = location.name.clone().unwrap_or_default(),
            address = location.address.clone().unwrap_or_default()
        ),
        None => logfire::warn!(
            "Location message {id} without coordinates",
            id = message.id.clone()
        ),
    }
    MessageOutcome::Logged
}

fn on_reaction(message: &InboundMessage) -> MessageOutcome {
    let reaction = message.reaction.clone().unwrap_or_default();
    logfire::info!(
        "Reaction from {from}: emoji={emoji}, message_id={message_id}",
        from = message.from.clone(),
        emoji = reaction.emoji.unwrap_or_default(),
        message_id = reaction.message_id.unwrap_or_default()
    );
    MessageOutcome::Logged
}

fn on_order(message: &InboundMessage) -> Result<MessageOutcome, DispatchError> {
    let summary = order::summarize_message(message)?;

    if let Some(order) = &message.order {
        for item in &order.product_items {
            logfire::info!(
                "Order {id} item {product_id}: {quantity} x {price} {currency}",
                id = message.id.clone(),
                product_id = item.product_retailer_id.clone(),
                quantity = item.quantity as i64,
                price = item.item_price.to_string(),
                currency = item.currency.clone()
            );
        }
        logfire::info!(
            "Order message from {from}: catalog_id={catalog_id}, text={text}, items={items}, total={total} {currency}",
            from = message.from.clone(),
            catalog_id = order.catalog_id.clone().unwrap_or_default(),
            text = order.text.clone().unwrap_or_default(),
            items = summary.item_count as i64,
            total = summary.total_amount.to_string(),
            currency = summary.currency.clone()
        );
    }

    Ok(MessageOutcome::Order(summary))
}

fn on_raw(
    message: &InboundMessage,
    label: &str,
    data: Option<&serde_json::Value>,
) -> MessageOutcome {
    logfire::info!(
        "{label} message from {from}: {data}",
        label = label.to_string(),
        from = message.from.clone(),
        data = data.map(ToString::to_string).unwrap_or_default()
    );
    MessageOutcome::Logged
}

fn on_unknown(message: &InboundMessage, raw_type: &str) -> MessageOutcome {
    logfire::warn!(
        "Unknown message type {type} from {from}, message {id}",
        r#type = raw_type.to_string(),
        from = message.from.clone(),
        id = message.id.clone()
    );
    MessageOutcome::Unknown(raw_type.to_string())
}

fn log_status(status: &StatusUpdate) {
    metric::incr_delivery_status_statds(&status.status.to_string());
    logfire::info!(
        "Message status update: id={id}, status={state}, timestamp={timestamp}, recipient_id={recipient_id}",
        id = status.id.clone(),
        state = status.status.to_string(),
        timestamp = status.timestamp.clone(),
        recipient_id = status.recipient_id.clone()
    );
}

//! # WhatsApp Webhook Handler
//!
//! Entry point shared by every webhook route: classifies the decoded body,
//! then walks its changes through the [`FieldDispatcher`].

use super::{
    classifier::{self, ClassifyError, WebhookShape},
    fields::{FieldDispatcher, FieldRoute},
    messages::{BatchReport, MessageDispatcher},
    order::OrderError,
};
use crate::services::MessagingApi;
use derive_more::{Display, Error};

/// Failure inside one field or message handler.
///
/// Never leaves the dispatcher: it is logged and recorded against the item.
#[derive(Debug, Display, Error)]
pub enum DispatchError {
    #[display("malformed {what}: {reason}")]
    Malformed {
        what: &'static str,
        reason: String,
    },
    #[display("{_0}")]
    Order(OrderError),
}

impl From<OrderError> for DispatchError {
    fn from(err: OrderError) -> Self {
        DispatchError::Order(err)
    }
}

/// Outcome of one change record
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeReport {
    pub entry_id: String,
    pub field: String,
    pub route: FieldRoute,
    /// Set for `messages` changes
    pub messages: Option<BatchReport>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub changes: Vec<ChangeReport>,
}

impl DispatchReport {
    pub fn failures(&self) -> usize {
        self.changes.iter().filter(|c| c.error.is_some()).count()
    }
}

/// Classifies and dispatches a webhook body.
///
/// `auto_reply` enables the automatic answer to text messages. Only a
/// structurally invalid envelope is an error, handler failures are contained
/// in the returned report.
pub async fn process_webhook(
    body: &serde_json::Value,
    auto_reply: Option<&dyn MessagingApi>,
) -> Result<DispatchReport, ClassifyError> {
    let shape = classifier::classify(body)?;

    match &shape {
        WebhookShape::BusinessAccount(envelope) | WebhookShape::Legacy(envelope) => {
            logfire::info!(
                "Webhook received: shape={shape}, entries={entries}",
                shape = shape.label(),
                entries = envelope.entry.len() as i64
            );
        }
        WebhookShape::Unrecognized => {
            logfire::warn!("Unrecognized webhook payload ignored");
        }
    }

    let dispatcher = FieldDispatcher::new(MessageDispatcher::new(auto_reply));
    let report = dispatcher.dispatch(&shape).await;

    if report.failures() > 0 {
        logfire::warn!(
            "Webhook processed with {failures} failed changes",
            failures = report.failures() as i64
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::whatsapp::{
        fields::BusinessField,
        messages::MessageOutcome,
        order::OrderSummary,
    };
    use rust_decimal::Decimal;
    use serde_json::json;

    #[ntex::test]
    async fn test_empty_order_payload() {
        let report = process_webhook(
            &json!({
                "object": "whatsapp_business_account",
                "entry": [{"id": "1", "changes": [{"field": "messages", "value": {
                    "messages": [{
                        "id": "m1", "from": "16505551234", "type": "order",
                        "order": {"catalog_id": "c1", "product_items": []}
                    }]
                }}]}]
            }),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.changes.len(), 1);
        let batch = report.changes[0].messages.as_ref().unwrap();
        assert_eq!(
            batch.messages[0].outcome,
            MessageOutcome::Order(OrderSummary {
                total_amount: Decimal::ZERO,
                currency: "USD".into(),
                item_count: 0,
            })
        );
    }

    #[ntex::test]
    async fn test_no_entries_invokes_nothing() {
        for body in [
            json!({"object": "whatsapp_business_account"}),
            json!({"object": "whatsapp_business_account", "entry": []}),
            json!({"object": "whatsapp_business_account", "entry": [{"id": "1"}]}),
            json!({"hello": "world"}),
        ] {
            let report = process_webhook(&body, None).await.unwrap();
            assert!(report.changes.is_empty());
        }
    }

    #[ntex::test]
    async fn test_changes_are_processed_in_order() {
        let report = process_webhook(
            &json!({
                "object": "whatsapp_business_account",
                "entry": [
                    {"id": "1", "changes": [
                        {"field": "security", "value": {"event": "PIN_CHANGED"}},
                        {"field": "messages", "value": {"messages": "oops"}}
                    ]},
                    {"id": "2", "changes": [
                        {"field": "account_update", "value": {"event": "VERIFIED_ACCOUNT"}}
                    ]}
                ]
            }),
            None,
        )
        .await
        .unwrap();

        let routes = report
            .changes
            .iter()
            .map(|c| (c.entry_id.as_str(), c.route.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            routes,
            [
                ("1", FieldRoute::Business(BusinessField::Security)),
                ("1", FieldRoute::Business(BusinessField::Messages)),
                ("2", FieldRoute::Business(BusinessField::AccountUpdate)),
            ]
        );
        assert_eq!(report.failures(), 1);
        assert!(report.changes[1].error.is_some());
    }

    #[ntex::test]
    async fn test_invalid_envelope_is_an_error() {
        let result = process_webhook(
            &json!({"object": "whatsapp_business_account", "entry": {"id": "1"}}),
            None,
        )
        .await;

        assert!(result.is_err());
    }
}

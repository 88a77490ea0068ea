//! # Order Summaries
//!
//! Totals for `order` messages. Amounts are [`Decimal`] so the total is the
//! exact sum of `item_price * quantity` with no rounding applied, expressed
//! in the unit the provider sent (major units for WhatsApp catalogs).

use super::schemas::{InboundMessage, OrderPayload};
use crate::consts;
use derive_more::{Display, Error};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Display, Error, PartialEq)]
pub enum OrderError {
    #[display("message {message_id} has no order data")]
    MissingOrderData {
        #[error(not(source))]
        message_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub total_amount: Decimal,
    pub currency: String,
    pub item_count: usize,
}

/// Computes the order totals.
///
/// The currency is taken from the first product item, an empty cart reports
/// a zero total in the default currency.
pub fn summarize(order: &OrderPayload) -> OrderSummary {
    let total_amount = order
        .product_items
        .iter()
        .map(|item| item.item_price * Decimal::from(item.quantity))
        .sum();

    let currency = order
        .product_items
        .first()
        .map(|item| item.currency.trim())
        .filter(|currency| !currency.is_empty())
        .unwrap_or(consts::DEFAULT_ORDER_CURRENCY)
        .to_string();

    OrderSummary {
        total_amount,
        currency,
        item_count: order.product_items.len(),
    }
}

/// Summarizes the order carried by an `order` message.
pub fn summarize_message(message: &InboundMessage) -> Result<OrderSummary, OrderError> {
    message
        .order
        .as_ref()
        .map(summarize)
        .ok_or_else(|| OrderError::MissingOrderData {
            message_id: message.id.clone(),
        })
}

use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("wa_relay_statds")
        .with_description("WhatsApp webhook relay statistics")
        .with_unit("event")
        .build()
});

fn incr_statds(metric: &'static str, value: String) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

pub fn incr_webhook_field_statds(field: &str) {
    incr_statds("webhook_field", field.into())
}

pub fn incr_message_type_statds(kind: &str) {
    incr_statds("message_type", kind.into())
}

pub fn incr_delivery_status_statds(status: &str) {
    incr_statds("delivery_status", status.into())
}

pub fn incr_outbound_statds(operation: &str) {
    incr_statds("outbound", operation.into())
}

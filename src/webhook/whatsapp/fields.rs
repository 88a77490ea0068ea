//! # Field Dispatcher
//!
//! Routes every change record of an envelope to the handler of its `field`.
//! Business-account payloads and legacy (profile) payloads use two disjoint
//! field tables; a field missing from the table of its shape lands in the
//! `Unknown` variant and is only logged.

use super::{
    classifier::WebhookShape,
    handler::{ChangeReport, DispatchError, DispatchReport},
    messages::{BatchReport, MessageDispatcher},
    schemas::{
        AccountEvent, BusinessCapabilityUpdate, Change, MessageBatch, PhoneNumberEvent,
        TemplateUpdate, WebhookEnvelope,
    },
};
use crate::metric;
use serde::de::DeserializeOwned;

macro_rules! field_table {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
            Unknown(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $key,)+
                    $name::Unknown(raw) => raw,
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $($key => $name::$variant,)+
                    other => $name::Unknown(other.to_string()),
                }
            }
        }
    };
}

field_table! {
    /// Fields of `whatsapp_business_account` payloads
    BusinessField {
        AccountAlerts => "account_alerts",
        BusinessCapabilityUpdate => "business_capability_update",
        MessageEchoes => "message_echoes",
        MessageTemplateQualityUpdate => "message_template_quality_update",
        MessageTemplateStatusUpdate => "message_template_status_update",
        Messages => "messages",
        MessagingHandovers => "messaging_handovers",
        PhoneNumberNameUpdate => "phone_number_name_update",
        PhoneNumberQualityUpdate => "phone_number_quality_update",
        AccountReviewUpdate => "account_review_update",
        SmbMessageEchoes => "smb_message_echoes",
        Security => "security",
        AccountUpdate => "account_update",
        UserPreferences => "user_preferences",
    }
}

field_table! {
    /// Profile fields of legacy payloads
    ProfileField {
        About => "about",
        Birthday => "birthday",
        Locale => "locale",
        Email => "email",
        FirstName => "first_name",
        Gender => "gender",
        Hometown => "hometown",
        LastName => "last_name",
        Likes => "likes",
        Location => "location",
        Name => "name",
        Photos => "photos",
        Posts => "posts",
        ProfilePic => "profile_pic",
        Quotes => "quotes",
        RelationshipStatus => "relationship_status",
        Television => "television",
        Videos => "videos",
    }
}

/// Handler table a change was routed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRoute {
    Business(BusinessField),
    Profile(ProfileField),
}

impl FieldRoute {
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            FieldRoute::Business(BusinessField::Unknown(_))
                | FieldRoute::Profile(ProfileField::Unknown(_))
        )
    }
}

pub struct FieldDispatcher<'a> {
    messages: MessageDispatcher<'a>,
}

impl<'a> FieldDispatcher<'a> {
    pub fn new(messages: MessageDispatcher<'a>) -> Self {
        Self { messages }
    }

    /// Dispatches every change of the payload, sequentially and in source order.
    pub async fn dispatch(&self, shape: &WebhookShape) -> DispatchReport {
        match shape {
            WebhookShape::BusinessAccount(envelope) => {
                self.dispatch_envelope(envelope, |field| {
                    FieldRoute::Business(BusinessField::from(field))
                })
                .await
            }
            WebhookShape::Legacy(envelope) => {
                self.dispatch_envelope(envelope, |field| {
                    FieldRoute::Profile(ProfileField::from(field))
                })
                .await
            }
            WebhookShape::Unrecognized => DispatchReport::default(),
        }
    }

    async fn dispatch_envelope(
        &self,
        envelope: &WebhookEnvelope,
        route_of: impl Fn(&str) -> FieldRoute,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for entry in &envelope.entry {
            logfire::info!("Processing entry {entry_id}", entry_id = entry.id.clone());

            for change in &entry.changes {
                let route = route_of(&change.field);
                metric::incr_webhook_field_statds(&change.field);
                logfire::debug!(
                    "Change detected in field {field}: {value}",
                    field = change.field.clone(),
                    value = change.value.to_string()
                );

                let (messages, error) = match self.handle(&route, change).await {
                    Ok(messages) => (messages, None),
                    Err(err) => {
                        logfire::error!(
                            "Failed to handle field {field} of entry {entry_id}: {error}",
                            field = change.field.clone(),
                            entry_id = entry.id.clone(),
                            error = err.to_string()
                        );
                        (None, Some(err.to_string()))
                    }
                };

                report.changes.push(ChangeReport {
                    entry_id: entry.id.clone(),
                    field: change.field.clone(),
                    route,
                    messages,
                    error,
                });
            }
        }

        report
    }

    async fn handle(
        &self,
        route: &FieldRoute,
        change: &Change,
    ) -> Result<Option<BatchReport>, DispatchError> {
        match route {
            FieldRoute::Business(field) => self.handle_business(field, &change.value).await,
            FieldRoute::Profile(field) => {
                on_profile_field(field, &change.value);
                Ok(None)
            }
        }
    }

    async fn handle_business(
        &self,
        field: &BusinessField,
        value: &serde_json::Value,
    ) -> Result<Option<BatchReport>, DispatchError> {
        match field {
            BusinessField::Messages => {
                let batch = decode::<MessageBatch>("messages", value)?;
                return Ok(Some(self.messages.dispatch_messages(&batch).await));
            }
            BusinessField::BusinessCapabilityUpdate => {
                on_capability_update(&decode("business_capability_update", value)?)
            }
            BusinessField::MessageTemplateQualityUpdate => {
                on_template_quality_update(&decode("message_template_quality_update", value)?)
            }
            BusinessField::MessageTemplateStatusUpdate => {
                on_template_status_update(&decode("message_template_status_update", value)?)
            }
            BusinessField::PhoneNumberNameUpdate => {
                on_phone_number_name_update(&decode("phone_number_name_update", value)?)
            }
            BusinessField::PhoneNumberQualityUpdate => {
                on_phone_number_quality_update(&decode("phone_number_quality_update", value)?)
            }
            BusinessField::Security => on_security(&decode("security", value)?),
            BusinessField::AccountReviewUpdate => {
                on_account_review_update(&decode("account_review_update", value)?)
            }
            BusinessField::AccountUpdate => on_account_update(&decode("account_update", value)?),
            BusinessField::AccountAlerts
            | BusinessField::MessageEchoes
            | BusinessField::MessagingHandovers
            | BusinessField::SmbMessageEchoes
            | BusinessField::UserPreferences => {
                logfire::info!(
                    "{field} event: {data}",
                    field = field.as_str().to_string(),
                    data = value.to_string()
                );
            }
            BusinessField::Unknown(raw) => {
                logfire::warn!(
                    "Unknown WhatsApp Business Account field: {field}",
                    field = raw.clone()
                );
            }
        }

        Ok(None)
    }
}

fn decode<T: DeserializeOwned>(
    what: &'static str,
    value: &serde_json::Value,
) -> Result<T, DispatchError> {
    serde_json::from_value(value.clone()).map_err(|e| DispatchError::Malformed {
        what,
        reason: e.to_string(),
    })
}

fn on_capability_update(update: &BusinessCapabilityUpdate) {
    let limit = |value: &Option<serde_json::Value>| {
        value.as_ref().map(ToString::to_string).unwrap_or_default()
    };
    logfire::info!(
        "Business capability update: max_daily_conversation_per_phone={conversations}, max_phone_numbers_per_waba={phone_numbers}",
        conversations = limit(&update.max_daily_conversation_per_phone),
        phone_numbers = limit(&update.max_phone_numbers_per_waba)
    );
}

fn on_template_quality_update(update: &TemplateUpdate) {
    logfire::info!(
        "Template quality update: {name} ({language}) {previous} -> {new}",
        name = update.message_template_name.clone().unwrap_or_default(),
        language = update.message_template_language.clone().unwrap_or_default(),
        previous = update.previous_quality_score.clone().unwrap_or_default(),
        new = update.new_quality_score.clone().unwrap_or_default()
    );
}

fn on_template_status_update(update: &TemplateUpdate) {
    logfire::info!(
        "Template status update: {name} ({language}) event={event}, reason={reason}",
        name = update.message_template_name.clone().unwrap_or_default(),
        language = update.message_template_language.clone().unwrap_or_default(),
        event = update.event.clone().unwrap_or_default(),
        reason = update.reason.clone().unwrap_or_default()
    );
}

fn on_phone_number_name_update(event: &PhoneNumberEvent) {
    logfire::info!(
        "Phone number name update: phone={phone}, decision={decision}, requested_name={requested_name}",
        phone = event.display_phone_number.clone().unwrap_or_default(),
        decision = event.decision.clone().unwrap_or_default(),
        requested_name = event.requested_verified_name.clone().unwrap_or_default()
    );
}

fn on_phone_number_quality_update(event: &PhoneNumberEvent) {
    logfire::info!(
        "Phone number quality update: phone={phone}, event={event_kind}, limit {old_limit} -> {current_limit}",
        phone = event.display_phone_number.clone().unwrap_or_default(),
        event_kind = event.event.clone().unwrap_or_default(),
        old_limit = event.old_limit.clone().unwrap_or_default(),
        current_limit = event.current_limit.clone().unwrap_or_default()
    );
}

fn on_security(event: &PhoneNumberEvent) {
    logfire::warn!(
        "Security event: phone={phone}, event={event_kind}, requester={requester}",
        phone = event.display_phone_number.clone().unwrap_or_default(),
        event_kind = event.event.clone().unwrap_or_default(),
        requester = event.requester.clone().unwrap_or_default()
    );
}

fn on_account_review_update(event: &AccountEvent) {
    logfire::info!(
        "Account review update: decision={decision}",
        decision = event.decision.clone().unwrap_or_default()
    );
}

fn on_account_update(event: &AccountEvent) {
    let ban_state = event
        .ban_info
        .as_ref()
        .and_then(|ban| ban.waba_ban_state.clone())
        .unwrap_or_default();

    logfire::info!(
        "Account update: phone={phone}, event={event_kind}, ban_state={ban_state}, verification_status={verification_status}",
        phone = event.phone_number.clone().unwrap_or_default(),
        event_kind = event.event.clone().unwrap_or_default(),
        ban_state = ban_state,
        verification_status = event.business_verification_status.clone().unwrap_or_default()
    );
}

fn on_profile_field(field: &ProfileField, value: &serde_json::Value) {
    match field {
        ProfileField::Unknown(raw) => {
            logfire::warn!("Unknown profile field: {field}", field = raw.clone());
        }
        known => {
            logfire::info!(
                "Profile field {field} changed: {value}",
                field = known.as_str().to_string(),
                value = value.to_string()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::whatsapp::{classifier::classify, messages::MessageOutcome};
    use serde_json::json;

    async fn dispatch(body: serde_json::Value) -> DispatchReport {
        let shape = classify(&body).unwrap();
        FieldDispatcher::new(MessageDispatcher::default())
            .dispatch(&shape)
            .await
    }

    #[test]
    fn test_field_tables() {
        assert_eq!(
            BusinessField::from("message_template_status_update"),
            BusinessField::MessageTemplateStatusUpdate
        );
        assert_eq!(BusinessField::from("smb_message_echoes").as_str(), "smb_message_echoes");
        assert_eq!(ProfileField::from("relationship_status"), ProfileField::RelationshipStatus);
        // disjoint domains
        assert_eq!(BusinessField::from("about"), BusinessField::Unknown("about".into()));
        assert_eq!(ProfileField::from("messages"), ProfileField::Unknown("messages".into()));
    }

    #[ntex::test]
    async fn test_every_business_field_is_routed() {
        let fields = [
            "account_alerts", "business_capability_update", "message_echoes",
            "message_template_quality_update", "message_template_status_update", "messages",
            "messaging_handovers", "phone_number_name_update", "phone_number_quality_update",
            "account_review_update", "smb_message_echoes", "security", "account_update",
            "user_preferences",
        ];
        let changes = fields
            .iter()
            .map(|field| json!({"field": field, "value": {}}))
            .collect::<Vec<_>>();

        let report = dispatch(json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "102290129340398", "changes": changes}]
        }))
        .await;

        assert_eq!(report.changes.len(), fields.len());
        assert_eq!(report.failures(), 0);
        assert!(report.changes.iter().all(|c| !c.route.is_unknown()));
        assert_eq!(
            report.changes[5].messages,
            Some(BatchReport::default())
        );
    }

    #[ntex::test]
    async fn test_unknown_field_is_ignored() {
        let report = dispatch(json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "1", "changes": [
                {"field": "calls", "value": {"id": "c1"}},
                {"field": "messages", "value": {"messages": [{"id": "m1", "from": "1", "type": "text", "text": {"body": "hi"}}]}}
            ]}]
        }))
        .await;

        assert_eq!(
            report.changes[0].route,
            FieldRoute::Business(BusinessField::Unknown("calls".into()))
        );
        assert!(report.changes[0].error.is_none());
        let batch = report.changes[1].messages.as_ref().unwrap();
        assert_eq!(batch.messages[0].outcome, MessageOutcome::Logged);
    }

    #[ntex::test]
    async fn test_legacy_profile_fields() {
        let report = dispatch(json!({
            "object": "user",
            "entry": [{"id": "44444444", "changes": [
                {"field": "about", "value": "new bio"},
                {"field": "photos", "value": {"verb": "add", "object_id": "1"}},
                {"field": "messages", "value": {"messages": []}}
            ]}]
        }))
        .await;

        let routes = report.changes.iter().map(|c| c.route.clone()).collect::<Vec<_>>();
        assert_eq!(
            routes,
            [
                FieldRoute::Profile(ProfileField::About),
                FieldRoute::Profile(ProfileField::Photos),
                FieldRoute::Profile(ProfileField::Unknown("messages".into())),
            ]
        );
        assert!(report.changes.iter().all(|c| c.messages.is_none()));
    }

    #[ntex::test]
    async fn test_phone_and_account_events_are_logged() {
        let report = dispatch(json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "1", "changes": [
                {"field": "phone_number_quality_update", "value": {
                    "display_phone_number": "15550783881",
                    "event": "DOWNGRADE",
                    "old_limit": "TIER_10K",
                    "current_limit": "TIER_1K"
                }},
                {"field": "security", "value": {
                    "display_phone_number": "15550783881",
                    "event": "PIN_CHANGED",
                    "requester": "2165467846"
                }},
                {"field": "account_update", "value": {
                    "phone_number": "15550783881",
                    "event": "VERIFIED_ACCOUNT",
                    "business_verification_status": "verified"
                }}
            ]}]
        }))
        .await;

        assert_eq!(report.changes.len(), 3);
        assert_eq!(report.failures(), 0);
        assert_eq!(
            report.changes[1].route,
            FieldRoute::Business(BusinessField::Security)
        );
    }

    #[ntex::test]
    async fn test_malformed_change_does_not_abort_siblings() {
        let report = dispatch(json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "1", "changes": [
                {"field": "message_template_status_update", "value": {"event": 42}},
                {"field": "account_update", "value": {
                    "phone_number": "15550783881",
                    "event": "ACCOUNT_VIOLATION",
                    "ban_info": {"waba_ban_state": "SCHEDULE_FOR_DISABLE", "waba_ban_date": "2026-01-01"}
                }},
                {"field": "messages", "value": null}
            ]}]
        }))
        .await;

        assert_eq!(report.changes.len(), 3);
        assert!(report.changes[0].error.is_some());
        assert!(report.changes[1].error.is_none());
        assert!(report.changes[2].error.is_some());
        assert_eq!(report.failures(), 2);
    }
}

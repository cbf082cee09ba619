use axum::{extract::State, Json};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::hooks::AsaasWebhookAuth,
    services::metrics::WEBHOOK_EVENTS_COUNTER,
    AppState,
};

/// Payment-provider event envelope. Only the fields the transitions need
/// are modeled; everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct AsaasEnvelope {
    pub id: Option<String>,
    pub event: Option<String>,
    pub payment: Option<AsaasPayment>,
    pub subscription: Option<AsaasSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPayment {
    /// Provider subscription id, when the payment belongs to one.
    pub subscription: Option<String>,
    /// Our tenant id, carried as the provider's external reference.
    pub external_reference: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasSubscription {
    pub id: Option<String>,
    pub external_reference: Option<String>,
}

/// External references are tenant ids; anything unparseable is ignored
/// with a warning rather than failing the event.
fn parse_tenant_ref(reference: Option<&str>) -> Option<Uuid> {
    let reference = reference?;
    match reference.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!("webhook: external reference is not a tenant id: {reference}");
            None
        }
    }
}

fn period_end_from(due_date: Option<NaiveDate>) -> Option<DateTime<Utc>> {
    due_date.map(|d| DateTime::from_naive_utc_and_offset(d.and_time(NaiveTime::MIN), Utc))
}

/// POST /webhooks/asaas — stateless event dispatcher. Unknown events are
/// acknowledged and ignored. The two conditional updates inside one event
/// are independent: a failure in one never rolls back the other, but any
/// failure fails the request so the provider retries.
pub async fn asaas_webhook(
    State(state): State<AppState>,
    _auth: AsaasWebhookAuth,
    Json(envelope): Json<AsaasEnvelope>,
) -> Result<Json<Value>, AppError> {
    let event = match envelope.event.as_deref() {
        Some(e) => e,
        None => return Ok(Json(json!({ "success": true }))),
    };

    WEBHOOK_EVENTS_COUNTER.with_label_values(&[event]).inc();

    // Replay protection: the provider redelivers events until acknowledged.
    // The dedup key is only written after successful processing, so a
    // failed event stays retryable.
    let dedup_key = envelope.id.as_ref().map(|id| format!("webhook:asaas:{id}"));
    if let Some(key) = &dedup_key {
        let mut redis = state.redis.clone();
        let seen: bool = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut redis)
            .await
            .unwrap_or(false);
        if seen {
            return Ok(Json(json!({ "success": true })));
        }
    }

    let mut first_error: Option<AppError> = None;
    let mut record = |result: Result<u64, AppError>, what: &str| match result {
        Ok(rows) => {
            if rows == 0 {
                tracing::warn!("webhook {event}: {what} matched no rows");
            }
        }
        Err(e) => {
            tracing::warn!("webhook {event}: {what} failed: {e}");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    };

    match event {
        "PAYMENT_RECEIVED" | "PAYMENT_CONFIRMED" => {
            if let Some(payment) = &envelope.payment {
                if let Some(sub_id) = payment.subscription.as_deref() {
                    let result = state
                        .subscriptions
                        .activate_by_provider_id(sub_id, period_end_from(payment.due_date))
                        .await;
                    record(result, "subscription activation");
                }
                if let Some(tenant_id) = parse_tenant_ref(payment.external_reference.as_deref()) {
                    let result = state.subscriptions.activate_tenant(tenant_id).await;
                    record(result, "tenant activation");
                }
            }
        }
        "PAYMENT_OVERDUE" => {
            if let Some(payment) = &envelope.payment {
                if let Some(tenant_id) = parse_tenant_ref(payment.external_reference.as_deref()) {
                    let result = state.subscriptions.mark_tenant_overdue(tenant_id).await;
                    record(result, "overdue stamp");
                }
            }
        }
        "SUBSCRIPTION_DELETED" => {
            if let Some(subscription) = &envelope.subscription {
                if let Some(sub_id) = subscription.id.as_deref() {
                    let result = state.subscriptions.delete_by_provider_id(sub_id).await;
                    record(result, "subscription deletion");
                }
                if let Some(tenant_id) =
                    parse_tenant_ref(subscription.external_reference.as_deref())
                {
                    let result = state.subscriptions.cancel_tenant(tenant_id).await;
                    record(result, "tenant cancellation");
                }
            }
        }
        other => {
            tracing::debug!("webhook: ignoring event {other}");
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    if let Some(key) = &dedup_key {
        let mut redis = state.redis.clone();
        let _: Result<(), _> = redis::cmd("SETEX")
            .arg(key)
            .arg(172_800u64) // 2 days
            .arg(1)
            .query_async(&mut redis)
            .await;
    }

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_envelope_parses() {
        let body = r#"{
            "id": "evt_0001",
            "event": "PAYMENT_CONFIRMED",
            "payment": {
                "subscription": "sub_123",
                "externalReference": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
                "dueDate": "2026-09-01"
            }
        }"#;

        let envelope: AsaasEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.event.as_deref(), Some("PAYMENT_CONFIRMED"));
        let payment = envelope.payment.unwrap();
        assert_eq!(payment.subscription.as_deref(), Some("sub_123"));
        assert!(parse_tenant_ref(payment.external_reference.as_deref()).is_some());
        assert!(period_end_from(payment.due_date).is_some());
    }

    #[test]
    fn subscription_deleted_envelope_parses() {
        let body = r#"{
            "event": "SUBSCRIPTION_DELETED",
            "subscription": {
                "id": "sub_123",
                "externalReference": "7c9e6679-7425-40de-944b-e07fc1f90ae7"
            }
        }"#;

        let envelope: AsaasEnvelope = serde_json::from_str(body).unwrap();
        let sub = envelope.subscription.unwrap();
        assert_eq!(sub.id.as_deref(), Some("sub_123"));
    }

    #[test]
    fn unknown_fields_and_events_are_tolerated() {
        let body = r#"{ "event": "PAYMENT_CREATED", "payment": { "value": 99.9 } }"#;
        let envelope: AsaasEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.event.as_deref(), Some("PAYMENT_CREATED"));
    }

    #[test]
    fn bad_external_reference_is_ignored() {
        assert!(parse_tenant_ref(Some("not-a-uuid")).is_none());
        assert!(parse_tenant_ref(None).is_none());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per tenant (unique on tenant_id). Upserted by admin action and
/// by the payment webhook; `status` here tracks the provider's view and may
/// include `deleted`, which has no tenant-level counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: String,
    pub status: String,
    pub billing_type: String,
    pub provider_subscription_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageSubscriptionRequest {
    pub plan_id: Option<String>,
    pub status: Option<String>,
    pub billing_type: Option<String>,
    pub months_to_add: Option<i32>,
}

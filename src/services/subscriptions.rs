use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::subscription::{ManageSubscriptionRequest, Subscription},
    models::tenant::SubscriptionStatus,
};

/// Subscription row maintenance. Admin actions upsert the per-tenant row
/// and mirror the status onto the tenant; webhook transitions are each a
/// single independent update — a failure in one never rolls back another.
#[derive(Clone)]
pub struct SubscriptionService {
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Admin-driven subscription management: partial update via COALESCE,
    /// optional period extension, tenant status kept in sync.
    pub async fn manage(
        &self,
        tenant_id: Uuid,
        req: ManageSubscriptionRequest,
    ) -> Result<Subscription, AppError> {
        // Status must be a known value before anything is written.
        let status: Option<SubscriptionStatus> = match req.status.as_deref() {
            Some(s) => Some(
                s.parse()
                    .map_err(|_| AppError::validation(format!("Status inválido: {s}")))?,
            ),
            None => None,
        };

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE id = $1)")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Tenant não encontrado".into()));
        }

        let mut subscription = sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions (tenant_id, plan_id, status, billing_type)
             VALUES ($1, COALESCE($2, 'starter'), COALESCE($3, 'pending'), COALESCE($4, 'pix'))
             ON CONFLICT (tenant_id) DO UPDATE SET
                plan_id      = COALESCE($2, subscriptions.plan_id),
                status       = COALESCE($3, subscriptions.status),
                billing_type = COALESCE($4, subscriptions.billing_type),
                updated_at   = NOW()
             RETURNING *",
        )
        .bind(tenant_id)
        .bind(&req.plan_id)
        .bind(status.map(|s| s.to_string()))
        .bind(&req.billing_type)
        .fetch_one(&self.pool)
        .await?;

        if let Some(months) = req.months_to_add {
            if months <= 0 {
                return Err(AppError::validation("monthsToAdd deve ser positivo"));
            }
            // Extend from the current period end, or from now if lapsed.
            subscription = sqlx::query_as::<_, Subscription>(
                "UPDATE subscriptions SET
                    current_period_end =
                        GREATEST(COALESCE(current_period_end, NOW()), NOW())
                        + make_interval(months => $2),
                    updated_at = NOW()
                 WHERE tenant_id = $1
                 RETURNING *",
            )
            .bind(tenant_id)
            .bind(months)
            .fetch_one(&self.pool)
            .await?;
        }

        if let Some(status) = status {
            sqlx::query(
                "UPDATE tenants SET
                    subscription_status = $2,
                    overdue_since = CASE WHEN $2 = 'active' THEN NULL ELSE overdue_since END,
                    updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(tenant_id)
            .bind(status.to_string())
            .execute(&self.pool)
            .await?;
        }

        Ok(subscription)
    }

    /// Payment confirmed for a provider subscription: activate it and move
    /// the period end to the payment's due date.
    pub async fn activate_by_provider_id(
        &self,
        provider_subscription_id: &str,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET
                status = 'active',
                current_period_end = COALESCE($2, current_period_end),
                updated_at = NOW()
             WHERE provider_subscription_id = $1",
        )
        .bind(provider_subscription_id)
        .bind(period_end)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Payment confirmed for a tenant: activate and clear the overdue stamp.
    pub async fn activate_tenant(&self, tenant_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE tenants SET
                subscription_status = 'active',
                overdue_since = NULL,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_tenant_overdue(&self, tenant_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE tenants SET
                subscription_status = 'past_due',
                overdue_since = NOW(),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Provider deleted the subscription: the row keeps the provider's
    /// terminal `deleted` status, which has no tenant-level counterpart.
    pub async fn delete_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'deleted', updated_at = NOW()
             WHERE provider_subscription_id = $1",
        )
        .bind(provider_subscription_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn cancel_tenant(&self, tenant_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE tenants SET subscription_status = 'canceled', updated_at = NOW()
             WHERE id = $1",
        )
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

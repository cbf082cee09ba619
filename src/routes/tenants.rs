use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AdminUser,
    middleware::rate_limit::check_rate_limit,
    models::subscription::ManageSubscriptionRequest,
    models::tenant::{CreateTenantRequest, CreateTenantResponse, Tenant},
    services::metrics::PROVISIONING_COUNTER,
    services::provisioning::CreateTenantInput,
    AppState,
};

/// Extracts the real client IP from reverse-proxy headers.
/// Priority: X-Real-IP → first X-Forwarded-For.
fn real_ip(headers: &HeaderMap) -> String {
    if let Some(ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return ip.to_string();
    }
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = xff.split(',').next() {
            return first.trim().to_string();
        }
    }
    "unknown".to_string()
}

/// Provision a tenant and its owning coach.
pub async fn create_tenant(
    State(state): State<AppState>,
    _admin: AdminUser,
    headers: HeaderMap,
    Json(body): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<CreateTenantResponse>), AppError> {
    // Abuse backstop: 10 tenants/hour per IP, 40/hour globally.
    let ip = real_ip(&headers);
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:create-tenant:ip:{ip}"), 10, 3600).await?;
    check_rate_limit(&mut redis, "rate:create-tenant:global", 40, 3600).await?;

    let result = state
        .provisioning
        .create_tenant(CreateTenantInput {
            full_name: body.full_name,
            username: body.username,
            password: body.password,
            business_name: body.business_name,
        })
        .await;

    let outcome = if result.is_ok() { "ok" } else { "error" };
    PROVISIONING_COUNTER
        .with_label_values(&["create_tenant", outcome])
        .inc();

    let (user_id, tenant_id) = result?;
    Ok((
        StatusCode::CREATED,
        Json(CreateTenantResponse {
            success: true,
            user_id,
            tenant_id,
        }),
    ))
}

pub async fn list_tenants(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Value>, AppError> {
    let tenants = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY name")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(json!({ "success": true, "data": tenants })))
}

/// Tear down a tenant and every identity under it.
pub async fn delete_tenant(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let result = state.provisioning.delete_tenant(tenant_id).await;

    let outcome = if result.is_ok() { "ok" } else { "error" };
    PROVISIONING_COUNTER
        .with_label_values(&["delete_tenant", outcome])
        .inc();

    result?;
    Ok(Json(json!({ "success": true })))
}

/// Upsert the tenant's subscription and mirror the status onto the tenant.
pub async fn manage_subscription(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<ManageSubscriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let subscription = state.subscriptions.manage(tenant_id, body).await?;
    Ok(Json(json!({ "success": true, "data": subscription })))
}

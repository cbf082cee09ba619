use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::bearer_user,
    models::profile::Role,
    services::gate::{self, Decision, GateContext, IdentitySnapshot, TenantSnapshot},
    AppState,
};

#[derive(Deserialize)]
pub struct GateQuery {
    pub path: String,
    /// Comma-separated roles the target route allows; all roles if absent.
    pub roles: Option<String>,
}

/// Resolve the caller's profile and tenant context, then evaluate the
/// navigation gate for the requested path. Anonymous callers are fine —
/// the evaluator answers with the login redirect.
pub async fn decision(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GateQuery>,
) -> Result<Json<Value>, AppError> {
    let user = bearer_user(&headers, &state.config.jwt_secret)?;

    let allowed_roles: Vec<Role> = match &query.roles {
        Some(csv) => csv.split(',').filter_map(|r| r.trim().parse().ok()).collect(),
        None => vec![Role::Admin, Role::Coach, Role::Client],
    };

    let mut identity: Option<IdentitySnapshot> = None;
    let mut tenant: Option<TenantSnapshot> = None;

    if let Some(user) = &user {
        let profile: Option<(String, Option<String>, Option<Uuid>)> =
            sqlx::query_as("SELECT role, cref, tenant_id FROM profiles WHERE id = $1")
                .bind(user.user_id)
                .fetch_optional(&state.db)
                .await?;

        let (role, cref, tenant_id) = match profile {
            Some((role, cref, tenant_id)) => {
                (role.parse().unwrap_or(user.role), cref, tenant_id)
            }
            // Token without a profile row: fall back to the token's claims.
            None => (user.role, None, user.tenant_id),
        };

        identity = Some(IdentitySnapshot { role, cref });

        if let Some(tenant_id) = tenant_id.or(user.tenant_id) {
            let status: Option<String> =
                sqlx::query_scalar("SELECT subscription_status FROM tenants WHERE id = $1")
                    .bind(tenant_id)
                    .fetch_optional(&state.db)
                    .await?;

            tenant = status.map(|s| TenantSnapshot {
                subscription_status: s.parse().ok(),
            });
        }
    }

    let ctx = GateContext {
        // Contexts are resolved synchronously above; the loading states
        // exist for shells that evaluate mid-refresh.
        identity_loading: false,
        tenant_loading: false,
        identity: identity.as_ref(),
        tenant: tenant.as_ref(),
        path: &query.path,
        allowed_roles: &allowed_roles,
    };

    let body = match gate::evaluate(&ctx) {
        Decision::Allow => json!({ "decision": "allow" }),
        Decision::Loading => json!({ "decision": "loading" }),
        Decision::Redirect(to) => json!({ "decision": "redirect", "to": to }),
    };

    Ok(Json(body))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::auth::AuthenticatedUser,
    models::invitation::{CreateInvitationRequest, Invitation},
    models::profile::{CompleteOnboardingRequest, Role},
    AppState,
};

/// GET /onboarding/invitations/{token} — the athlete app validates an
/// invitation before showing the signup form.
pub async fn validate_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    let invitation = fetch_pending(&state, &token).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "tenantId": invitation.tenant_id,
            "email": invitation.email,
            "role": invitation.role,
            "expiresAt": invitation.expires_at,
        }
    })))
}

/// POST /onboarding/invitations/{token}/accept — consume the invitation
/// once the athlete finished signup.
pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    let invitation = fetch_pending(&state, &token).await?;

    sqlx::query("UPDATE invitations SET status = 'accepted' WHERE id = $1")
        .bind(invitation.id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "success": true })))
}

async fn fetch_pending(state: &AppState, token: &str) -> Result<Invitation, AppError> {
    let invitation = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token = $1")
        .bind(token)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Convite não encontrado".into()))?;

    if invitation.status != "pending" {
        return Err(AppError::validation("Convite já utilizado"));
    }
    if invitation.expires_at < Utc::now() {
        return Err(AppError::validation("Convite expirado"));
    }

    Ok(invitation)
}

/// POST /onboarding/cref — the coach completes onboarding by filling in
/// the professional registration the gate requires.
pub async fn complete_onboarding(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CompleteOnboardingRequest>,
) -> Result<Json<Value>, AppError> {
    if user.role != Role::Coach {
        return Err(AppError::Unauthorized);
    }
    if body.cref.trim().is_empty() {
        return Err(AppError::validation("Campo obrigatório: cref"));
    }

    let updated = sqlx::query("UPDATE profiles SET cref = $2, updated_at = NOW() WHERE id = $1")
        .bind(user.user_id)
        .bind(body.cref.trim())
        .execute(&state.db)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Perfil não encontrado".into()));
    }

    Ok(Json(json!({ "success": true })))
}

/// POST /invitations — a coach invites an athlete by email. The token goes
/// out through the coach's own channel; the API only stores it.
pub async fn create_invitation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if user.role != Role::Coach {
        return Err(AppError::Unauthorized);
    }
    let tenant_id = user.tenant_id.ok_or(AppError::Unauthorized)?;

    if !body.email.contains('@') {
        return Err(AppError::validation("E-mail inválido"));
    }

    let token: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(48)
        .map(char::from)
        .collect();
    let expires_at = Utc::now() + chrono::Duration::days(7);
    let role = body.role.unwrap_or(Role::Client);

    let invitation = sqlx::query_as::<_, Invitation>(
        "INSERT INTO invitations (token, tenant_id, email, role, expires_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(&token)
    .bind(tenant_id)
    .bind(body.email.trim())
    .bind(role.to_string())
    .bind(expires_at)
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": invitation })),
    ))
}

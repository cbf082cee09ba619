use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::hooks::InternalHookAuth,
    models::auth::AuthenticatedUser,
    services::metrics::CHAT_PUSH_COUNTER,
    services::notifications::{ChatMessageRecord, ChatPushOutcome, NotificationService},
    AppState,
};

/// POST /notifications/chat — fired by the data layer when a chat message
/// is inserted. Unlike the provisioning endpoints, an unexpected failure
/// here surfaces as a 500: the caller is a machine, not a user.
pub async fn chat_notification(
    State(state): State<AppState>,
    _auth: InternalHookAuth,
    Json(record): Json<ChatMessageRecord>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let outcome = state
        .notifications
        .notify_chat_message(&state.db, &record)
        .await
        .map_err(|e| {
            CHAT_PUSH_COUNTER.with_label_values(&["error"]).inc();
            tracing::error!("chat push dispatch failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    match outcome {
        ChatPushOutcome::Sent(expo_data) => {
            CHAT_PUSH_COUNTER.with_label_values(&["sent"]).inc();
            Ok(Json(json!({ "success": true, "expoData": expo_data })))
        }
        ChatPushOutcome::NoToken => {
            CHAT_PUSH_COUNTER.with_label_values(&["no_token"]).inc();
            Ok(Json(json!({ "success": false, "reason": "No token" })))
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterPushTokenRequest {
    pub platform: Option<String>,
    pub token: String,
}

/// POST /push-tokens — athletes register their device token after login.
pub async fn register_push_token(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RegisterPushTokenRequest>,
) -> Result<Json<Value>, AppError> {
    let tenant_id = user.tenant_id.ok_or(AppError::Unauthorized)?;

    if body.token.trim().is_empty() {
        return Err(AppError::validation("Campo obrigatório: token"));
    }

    NotificationService::register_push_token(
        &state.db,
        user.user_id,
        tenant_id,
        body.platform.as_deref().unwrap_or("expo"),
        &body.token,
    )
    .await?;

    Ok(Json(json!({ "success": true })))
}

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::error::AppError;
use crate::AppState;

/// Extractor that validates the `asaas-access-token` header against the
/// configured webhook secret.
pub struct AsaasWebhookAuth;

impl FromRequestParts<AppState> for AsaasWebhookAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("asaas-access-token")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        if token != state.config.asaas_webhook_token {
            return Err(AppError::Unauthorized);
        }

        Ok(AsaasWebhookAuth)
    }
}

/// Extractor that validates the `x-internal-token` header for hooks fired
/// by the data layer (chat notification trigger).
pub struct InternalHookAuth;

impl FromRequestParts<AppState> for InternalHookAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("x-internal-token")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        if token != state.config.internal_hook_key {
            return Err(AppError::Unauthorized);
        }

        Ok(InternalHookAuth)
    }
}

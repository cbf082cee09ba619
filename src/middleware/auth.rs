use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::error::AppError;
use crate::models::auth::{AuthenticatedUser, Claims};
use crate::models::profile::Role;

/// Extension type to carry the JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("JWT secret not configured")))?
            .clone();

        bearer_user(&parts.headers, &secret.0)?.ok_or(AppError::Unauthorized)
    }
}

/// Extractor for admin-only endpoints: a valid bearer token whose role
/// claim is `admin`.
pub struct AdminUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::Unauthorized);
        }
        Ok(AdminUser(user))
    }
}

/// Decodes the Authorization header if present. Returns `Ok(None)` when the
/// header is missing, so callers that tolerate anonymous requests (the gate
/// endpoint) can distinguish "no identity" from "bad token".
pub fn bearer_user(headers: &HeaderMap, secret: &str) -> Result<Option<AuthenticatedUser>, AppError> {
    let header = match headers.get("Authorization").and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => return Ok(None),
    };

    let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
    decode_access_token(token, secret)
        .map(Some)
        .map_err(|_| AppError::Unauthorized)
}

pub fn decode_access_token(token: &str, secret: &str) -> Result<AuthenticatedUser, anyhow::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation)?;
    let claims = data.claims;

    Ok(AuthenticatedUser {
        user_id: claims.sub.parse()?,
        role: claims.role,
        tenant_id: claims.tenant_id,
    })
}

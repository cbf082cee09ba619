use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::Role;

/// Claims embedded in the identity provider's HS256 access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // identity UUID
    pub role: Role,
    pub tenant_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated bearer token — available via Axum extractors.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AdminUser,
    models::auth::AuthenticatedUser,
    models::profile::{CreateAthleteRequest, CreateAthleteResponse, ResetPasswordRequest, Role},
    services::calculations,
    services::metrics::PROVISIONING_COUNTER,
    services::provisioning::CreateManagedUserInput,
    AppState,
};

/// Coaches may only manage athletes inside their own tenant; admins are
/// unrestricted.
fn require_tenant_access(user: &AuthenticatedUser, tenant_id: Uuid) -> Result<(), AppError> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Coach if user.tenant_id == Some(tenant_id) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

/// Create a managed user (athlete by default) under an existing tenant.
pub async fn create_athlete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateAthleteRequest>,
) -> Result<(StatusCode, Json<CreateAthleteResponse>), AppError> {
    require_tenant_access(&user, body.tenant_id)?;

    let result = state
        .provisioning
        .create_managed_user(CreateManagedUserInput {
            full_name: body.full_name,
            username: body.username,
            password: body.password,
            tenant_id: body.tenant_id,
            role: body.role.unwrap_or(Role::Client),
        })
        .await;

    let outcome = if result.is_ok() { "ok" } else { "error" };
    PROVISIONING_COUNTER
        .with_label_values(&["create_managed_user", outcome])
        .inc();

    let user_id = result?;
    Ok((
        StatusCode::CREATED,
        Json(CreateAthleteResponse {
            success: true,
            user_id,
        }),
    ))
}

/// Tear down a single user: client rows, profile, then identity.
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let result = state.provisioning.delete_user(user_id).await;

    let outcome = if result.is_ok() { "ok" } else { "error" };
    PROVISIONING_COUNTER
        .with_label_values(&["delete_user", outcome])
        .inc();

    result?;
    Ok(Json(json!({ "success": true })))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMetricsRequest {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub sex: calculations::Sex,
    pub activity_level: Option<calculations::ActivityLevel>,
}

/// POST /app/metrics — the athlete app asks for its derived numbers
/// instead of reimplementing the formulas per platform.
pub async fn body_metrics(
    _user: AuthenticatedUser,
    Json(body): Json<BodyMetricsRequest>,
) -> Result<Json<Value>, AppError> {
    if body.weight_kg <= 0.0 || body.height_cm <= 0.0 {
        return Err(AppError::validation("Peso e altura devem ser positivos"));
    }

    let bmr = calculations::bmr(body.weight_kg, body.height_cm, body.age, body.sex);
    let level = body
        .activity_level
        .unwrap_or(calculations::ActivityLevel::Sedentary);
    let tdee = calculations::tdee(bmr, level);
    let bmi = calculations::bmi(body.weight_kg, body.height_cm / 100.0);
    let macros = calculations::macro_split(tdee);

    Ok(Json(json!({
        "success": true,
        "data": {
            "bmr": bmr,
            "bmi": bmi,
            "tdee": tdee,
            "macros": {
                "proteinG": macros.protein_g,
                "carbsG": macros.carbs_g,
                "fatG": macros.fat_g,
            },
        }
    })))
}

/// Admin sets a new password at the identity provider.
pub async fn reset_password(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    state
        .provisioning
        .reset_password(user_id, &body.new_password)
        .await?;

    Ok(Json(json!({ "success": true })))
}

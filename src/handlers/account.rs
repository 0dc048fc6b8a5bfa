use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handlers::common::{success_response, validate_input};
use crate::services::accounts::{ProfileUpdate, SettingsUpdate};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2))]
    #[schema(example = "Ada Lovelace")]
    pub name: Option<String>,
    #[validate(email)]
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    #[validate(url)]
    pub image: Option<String>,
    #[validate(length(min = 6))]
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSettingsRequest {
    pub email_notifications: Option<bool>,
    pub order_updates: Option<bool>,
    pub marketing_emails: Option<bool>,
    pub security_alerts: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1))]
    pub password: String,
}

/// Fetch the caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/user/profile",
    responses(
        (status = 200, description = "Profile"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    current_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .services
        .accounts
        .get_profile(current_user.user_id)
        .await?;

    Ok(success_response(json!({ "user": user })))
}

/// Update the caller's profile
#[utoipa::path(
    patch,
    path = "/api/v1/user/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Validation failed or wrong current password", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    current_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let update = ProfileUpdate {
        name: payload.name,
        email: payload.email,
        image: payload.image,
        new_password: payload.new_password,
        current_password: payload.current_password,
    };

    let user = state
        .services
        .accounts
        .update_profile(current_user.user_id, update)
        .await?;

    Ok(success_response(json!({ "user": user })))
}

/// Fetch the caller's notification settings
#[utoipa::path(
    get,
    path = "/api/v1/user/settings",
    responses(
        (status = 200, description = "Notification settings"),
        (status = 404, description = "No settings saved yet", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    current_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state
        .services
        .accounts
        .get_settings(current_user.user_id)
        .await?;

    Ok(success_response(json!({ "settings": settings })))
}

/// Update the caller's notification settings
#[utoipa::path(
    patch,
    path = "/api/v1/user/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated (created on first write)"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    current_user: AuthUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = SettingsUpdate {
        email_notifications: payload.email_notifications,
        order_updates: payload.order_updates,
        marketing_emails: payload.marketing_emails,
        security_alerts: payload.security_alerts,
    };

    let settings = state
        .services
        .accounts
        .update_settings(current_user.user_id, update)
        .await?;

    Ok(success_response(json!({ "settings": settings })))
}

/// Delete the caller's account and all owned data
#[utoipa::path(
    post,
    path = "/api/v1/user/delete",
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Account deleted"),
        (status = 400, description = "Wrong password", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn delete_account(
    State(state): State<AppState>,
    current_user: AuthUser,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .accounts
        .delete_account(current_user.user_id, &payload.password)
        .await?;

    Ok(success_response(json!({ "message": "Account deleted" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).patch(update_profile))
        .route("/settings", get(get_settings).patch(update_settings))
        .route("/delete", post(delete_account))
}

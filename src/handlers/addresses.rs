use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::addresses::AddressInput;
use crate::AppState;

/// Address payload for create and update. The default flag is not accepted
/// here; it is assigned server-side.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddressRequest {
    #[validate(length(min = 1))]
    #[schema(example = "1 Main St")]
    pub street: String,
    #[validate(length(min = 1))]
    #[schema(example = "Springfield")]
    pub city: String,
    #[validate(length(min = 1))]
    #[schema(example = "IL")]
    pub state: String,
    #[validate(length(min = 1))]
    #[schema(example = "US")]
    pub country: String,
    #[validate(length(min = 1))]
    #[schema(example = "62704")]
    pub zip_code: String,
}

impl From<AddressRequest> for AddressInput {
    fn from(payload: AddressRequest) -> Self {
        Self {
            street: payload.street,
            city: payload.city,
            state: payload.state,
            country: payload.country,
            zip_code: payload.zip_code,
        }
    }
}

/// List the caller's shipping addresses
#[utoipa::path(
    get,
    path = "/api/v1/user/addresses",
    responses(
        (status = 200, description = "Addresses, default first"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    current_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let addresses = state
        .services
        .addresses
        .list_addresses(current_user.user_id)
        .await?;

    Ok(success_response(json!({ "addresses": addresses })))
}

/// Add a shipping address
#[utoipa::path(
    post,
    path = "/api/v1/user/addresses",
    request_body = AddressRequest,
    responses(
        (status = 201, description = "Address created; first address becomes default"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "addresses"
)]
pub async fn create_address(
    State(state): State<AppState>,
    current_user: AuthUser,
    Json(payload): Json<AddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .addresses
        .create_address(current_user.user_id, payload.into())
        .await?;

    Ok(created_response(json!({ "address": address })))
}

/// Update a shipping address
#[utoipa::path(
    patch,
    path = "/api/v1/user/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address updated"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "addresses"
)]
pub async fn update_address(
    State(state): State<AppState>,
    current_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .addresses
        .update_address(current_user.user_id, id, payload.into())
        .await?;

    Ok(success_response(json!({ "address": address })))
}

/// Delete a shipping address
#[utoipa::path(
    delete,
    path = "/api/v1/user/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address deleted; default re-assigned if needed"),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "addresses"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    current_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .addresses
        .delete_address(current_user.user_id, id)
        .await?;

    Ok(success_response(json!({ "message": "Address deleted" })))
}

/// Make an address the default
#[utoipa::path(
    patch,
    path = "/api/v1/user/addresses/{id}/default",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address is now the single default"),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "addresses"
)]
pub async fn set_default_address(
    State(state): State<AppState>,
    current_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let address = state
        .services
        .addresses
        .set_default(current_user.user_id, id)
        .await?;

    Ok(success_response(json!({ "address": address })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route("/:id", patch(update_address).delete(delete_address))
        .route("/:id/default", patch(set_default_address))
}

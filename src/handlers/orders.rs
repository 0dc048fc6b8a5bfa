use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde_json::json;

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::AppState;

/// List the caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/user/orders",
    responses(
        (status = 200, description = "Order history with line items and shipping snapshots"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(current_user.user_id)
        .await?;

    Ok(success_response(json!({ "orders": orders })))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_orders))
}

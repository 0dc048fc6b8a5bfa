use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

use crate::errors::ApiError;

/// 200 OK with a JSON body.
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// 201 Created with a JSON body.
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Runs validator-derive checks on a request payload.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 2))]
        name: String,
    }

    #[test]
    fn validate_input_accepts_valid_payload() {
        let payload = Payload {
            name: "Ada".to_string(),
        };
        assert!(validate_input(&payload).is_ok());
    }

    #[test]
    fn validate_input_rejects_invalid_payload() {
        let payload = Payload {
            name: "A".to_string(),
        };
        let err = validate_input(&payload).unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[tokio::test]
    async fn success_response_is_200() {
        let response = success_response(json!({"ok": true}));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn created_response_is_201() {
        let response = created_response(json!({"ok": true}));
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

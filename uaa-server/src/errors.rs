use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ErrorBody {
    /// Short error code, e.g. "unauthorized"
    pub error: String,
    /// Human-readable description
    pub error_description: String,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub error: String,
    pub description: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with an error code, description and status code
    pub fn new<C: ToString, D: ToString>(error: C, description: D, status_code: StatusCode) -> Self {
        Self {
            error: error.to_string(),
            description: description.to_string(),
            status_code,
        }
    }

    /// Create new Unauthorized (401) error
    pub fn unauthorized<D: ToString>(description: D) -> Self {
        Self::new("unauthorized", description, StatusCode::UNAUTHORIZED)
    }

    /// Create new Forbidden (403) error
    pub fn forbidden<D: ToString>(description: D) -> Self {
        Self::new("access_denied", description, StatusCode::FORBIDDEN)
    }

    /// Create new Not Found (404) error
    pub fn not_found<C: ToString, D: ToString>(error: C, description: D) -> Self {
        Self::new(error, description, StatusCode::NOT_FOUND)
    }

    /// Create new Bad Request (400) error
    pub fn bad_request<C: ToString, D: ToString>(error: C, description: D) -> Self {
        Self::new(error, description, StatusCode::BAD_REQUEST)
    }

    /// Create new Conflict (409) error
    pub fn conflict<C: ToString, D: ToString>(error: C, description: D) -> Self {
        Self::new(error, description, StatusCode::CONFLICT)
    }

    /// Create new Internal Server Error (500) with a description
    pub fn internal<D: ToString>(description: D) -> Self {
        Self::new("internal_error", description, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.error,
            error_description: self.description,
        };
        (self.status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::conflict("client_already_exists", "Client already exists: c1")
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "error": "client_already_exists",
                "error_description": "Client already exists: c1",
            })
        );
    }
}

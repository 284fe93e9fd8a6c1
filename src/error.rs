// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::hierarchy::HierarchyError;
use crate::services::ServiceError;

/// HTTP API error: a status, a stable machine-readable code and a
/// client-safe message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message,
            "code": self.code
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", message)
    }
}

impl From<HierarchyError> for ApiError {
    fn from(err: HierarchyError) -> Self {
        let status = match &err {
            HierarchyError::NotFound { .. } => StatusCode::NOT_FOUND,
            HierarchyError::InUse(_) => StatusCode::CONFLICT,
            HierarchyError::ScopeMismatch | HierarchyError::InsufficientRole => StatusCode::FORBIDDEN,
            HierarchyError::PlacementRequired => StatusCode::BAD_REQUEST,
            HierarchyError::StoreUnavailable(detail) => {
                // Don't expose backend details to clients
                tracing::error!("store unavailable: {}", detail);
                return ApiError::service_unavailable("Store temporarily unavailable, please retry");
            }
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Hierarchy(e) => e.into(),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Invalid(msg) => ApiError::validation_error(msg),
            ServiceError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, "invalid_credentials", "Invalid username or password")
            }
            ServiceError::Password(e) => {
                tracing::error!("password hashing failed: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            ServiceError::Jwt(e) => {
                tracing::error!("token issue failed: {}", e);
                ApiError::internal_server_error("Failed to issue token")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Level;

    #[test]
    fn hierarchy_errors_map_to_transport() {
        let cases = [
            (HierarchyError::ScopeMismatch, StatusCode::FORBIDDEN, "scope_mismatch"),
            (HierarchyError::InsufficientRole, StatusCode::FORBIDDEN, "insufficient_role"),
            (HierarchyError::InUse(Level::Branch), StatusCode::CONFLICT, "branch_in_use"),
            (HierarchyError::PlacementRequired, StatusCode::BAD_REQUEST, "placement_required"),
            (
                HierarchyError::StoreUnavailable("pool timed out".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
            ),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status_code(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn unavailable_hides_backend_detail() {
        let api = ApiError::from(HierarchyError::StoreUnavailable("password=secret".into()));
        assert!(!api.message().contains("secret"));
    }

    #[test]
    fn body_has_envelope() {
        let v = ApiError::not_found("nope").to_json();
        assert_eq!(v["success"], false);
        assert_eq!(v["code"], "not_found");
        assert_eq!(v["error"], "nope");
    }
}

//! Error-to-HTTP response conversion.
//!
//! Every handler failure becomes the same JSON body:
//! `{ "error": <reason phrase>, "message": <description>, "statusCode": <u16> }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// JSON body of an error response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// HTTP reason phrase, e.g. `Not Found`.
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: sf_core::Error,
}

impl AppError {
    pub fn new(inner: sf_core::Error) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.inner.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Client-facing description. Missing entities are reported without
    /// echoing the identifier back.
    fn message(&self) -> String {
        match &self.inner {
            sf_core::Error::NotFound { entity, .. } => format!("The {entity} is not found."),
            other => other.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let status = self.status();
        ErrorBody {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.message(),
            status_code: status.as_u16(),
        }
    }
}

impl From<sf_core::Error> for AppError {
    fn from(e: sf_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<sf_core::IdError> for AppError {
    fn from(e: sf_core::IdError) -> Self {
        Self::new(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        (status, axum::Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404_body() {
        let err = AppError::new(sf_core::Error::not_found("episode", "abc"));
        let body = err.body();
        assert_eq!(body.error, "Not Found");
        assert_eq!(body.message, "The episode is not found.");
        assert_eq!(body.status_code, 404);
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn generation_failure_is_500() {
        let err = AppError::new(sf_core::Error::generation(
            "s1",
            sf_core::Error::tool("ffmpeg", "exit 1"),
        ));
        let body = err.body();
        assert_eq!(body.status_code, 500);
        assert_eq!(body.error, "Internal Server Error");
        assert!(body.message.contains("stream s1"));
    }

    #[test]
    fn invalid_id_is_400() {
        let err = AppError::from(sf_core::IdError::Empty);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn body_uses_camel_case() {
        let body = AppError::new(sf_core::Error::Validation("bad".into())).body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["error"], "Bad Request");
    }
}

//! HTTP rendering of [`ServiceError`]: `{ "error": <message>, "code": <CODE> }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::ServiceError;
use crate::store::StoreError;

impl ServiceError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) | Self::Store(StoreError::DuplicateActive { .. }) => {
                (StatusCode::CONFLICT, "CONFLICT")
            }
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Contract(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_CONTRACT"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "An internal error occurred".to_string()
        } else {
            if status.is_server_error() {
                error!("Upstream failure: {}", self);
            }
            self.to_string()
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("debate", 4), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("taken".into()), StatusCode::CONFLICT),
            (
                ServiceError::Store(StoreError::DuplicateActive {
                    match_id: 1,
                    debate_type: crate::debate::DebateType::PreMatch,
                }),
                StatusCode::CONFLICT,
            ),
            (ServiceError::Unauthorized("who".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Contract("no cards".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::Upstream(anyhow::anyhow!("down")), StatusCode::BAD_GATEWAY),
            (
                ServiceError::Store(StoreError::Unavailable("gone".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_code().0, expected, "{err}");
            assert_eq!(err.into_response().status(), expected);
        }
    }
}

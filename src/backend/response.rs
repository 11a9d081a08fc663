use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::error::ServiceError;
use crate::services::AccessDenied;

/// Everything a handler can fail with. Rendered as
/// `{ "success": false, "error": "<message>" }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Access(#[from] AccessDenied),

    #[error("{0}")]
    InvalidCredentials(&'static str),

    #[error("{0}")]
    LockedOut(&'static str),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    SetupRejected(&'static str),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(err) => match err {
                ServiceError::Validation(_)
                | ServiceError::DuplicateUsername
                | ServiceError::SelfDeletion => StatusCode::BAD_REQUEST,
                ServiceError::Forbidden => StatusCode::FORBIDDEN,
                ServiceError::NotFound => StatusCode::NOT_FOUND,
                ServiceError::Storage(_) | ServiceError::Credential(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Access(AccessDenied::NotAuthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Access(AccessDenied::NotAdmin) => StatusCode::FORBIDDEN,
            ApiError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            ApiError::LockedOut(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::SetupRejected(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Service(ServiceError::Storage(e)) => error!(error = %e, "Storage failure"),
            ApiError::Service(ServiceError::Credential(e)) => {
                error!(error = %e, "Credential hashing failure")
            }
            _ => {}
        }

        let body = json!({
            "success": false,
            "error": self.to_string(),
        });

        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult = Result<Response, ApiError>;

/// `{ "success": true, "error": null, ...payload }`.
pub fn success(status: StatusCode, payload: Value) -> Response {
    let mut body = json!({ "success": true, "error": null });
    if let (Some(fields), Value::Object(extra)) = (body.as_object_mut(), payload) {
        fields.extend(extra);
    }
    (status, Json(body)).into_response()
}

pub fn ok(payload: Value) -> Response {
    success(StatusCode::OK, payload)
}

//! Standardized API error responses.

use axum::Json;
use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};
use ts_rs::TS;

use crate::data::connections::ConnectionError;
use crate::data::doubts::DoubtError;
use crate::matching::PipelineError;
use crate::store::StoreError;

/// Machine-readable error code returned in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ApiErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    InternalError,
    ServiceUnavailable,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the standard error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Log a store failure and convert it to a response without leaking details.
///
/// Connectivity failures map to 503 so clients can retry; anything else is a
/// 500.
pub fn store_error(context: &str, e: StoreError) -> ApiError {
    match e {
        StoreError::Database(e) => {
            error!(error = ?e, context, "store unavailable");
            ApiError::new(ApiErrorCode::ServiceUnavailable, "Storage is unavailable")
        }
        e => {
            error!(error = ?e, context, "store operation failed");
            ApiError::internal_error(format!("{context} failed"))
        }
    }
}

impl From<DoubtError> for ApiError {
    fn from(e: DoubtError) -> Self {
        match e {
            DoubtError::MissingFields => ApiError::bad_request(e.to_string()),
            DoubtError::NotLearner | DoubtError::NotEligible { .. } => {
                ApiError::forbidden(e.to_string())
            }
            DoubtError::NotFound(_) => ApiError::not_found(e.to_string()),
            DoubtError::Store(e) => store_error("Doubt operation", e),
        }
    }
}

impl From<ConnectionError> for ApiError {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::SelfRequest => ApiError::bad_request(e.to_string()),
            ConnectionError::UserNotFound(_) | ConnectionError::RequestNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            ConnectionError::AlreadyConnected(_) | ConnectionError::AlreadyRequested(_) => {
                ApiError::conflict(e.to_string())
            }
            ConnectionError::NotRecipient => ApiError::forbidden(e.to_string()),
            ConnectionError::Store(e) => store_error("Connection operation", e),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::CandidatePool(e) => store_error("Tutor pool lookup", e),
            PipelineError::Persist(e) => {
                warn!(error = %e, "failed to persist match results");
                e.into()
            }
        }
    }
}

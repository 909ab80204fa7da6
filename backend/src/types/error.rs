//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::tokens::IssueError;
use crate::upload::CommitError;

/// API error response body
#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiErrorResponse {
    /// Machine-readable error code or validation message
    pub err: String,
    /// Per-field validation failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// A single field validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FieldError {
    /// Request field that failed validation
    pub field: String,
    /// Rule that was violated
    pub msg: String,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(status: StatusCode, err: impl Into<String>) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                err: err.into(),
                errors: Vec::new(),
            },
        }
    }

    /// Attach per-field validation failures
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.inner.errors = errors;
        self
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Error code or message carried in the body
    #[must_use]
    pub fn err(&self) -> &str {
        &self.inner.err
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!("Client error: {} - {}", self.status, self.inner.err),
            500..=599 => tracing::error!("Server error: {} - {}", self.status, self.inner.err),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert token issuance errors to application errors
impl From<IssueError> for AppError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::InvalidSecret => Self::new(StatusCode::UNAUTHORIZED, "INVALID_SECRET"),
            IssueError::InvalidKey(key_err) => {
                let mut errors = ValidationErrors::new();
                errors.add("key", key_err.into());
                errors.into()
            }
            IssueError::TokenStore(storage_err) => {
                tracing::error!("Token store error: {storage_err}");
                Self::internal()
            }
        }
    }
}

/// Convert request validation failures to application errors
///
/// The first failure message doubles as the top-level `err`.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut field_errors: Vec<FieldError> = errors
            .errors()
            .iter()
            .filter_map(|(field, kind)| match kind {
                ValidationErrorsKind::Field(errors) => Some((field, errors)),
                _ => None,
            })
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    msg: error
                        .message
                        .as_ref()
                        .map_or_else(|| error.code.to_string(), ToString::to_string),
                })
            })
            .collect();
        field_errors.sort_by(|a, b| a.field.cmp(&b.field));

        let err = field_errors
            .first()
            .map_or_else(|| "VALIDATION_ERROR".to_string(), |error| error.msg.clone());

        Self::new(StatusCode::BAD_REQUEST, err).with_errors(field_errors)
    }
}

/// Convert commit errors to application errors
impl From<CommitError> for AppError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::TokenInvalid => Self::new(StatusCode::BAD_REQUEST, "INVALID_TOKEN"),
            CommitError::EmptyPayload => Self::new(StatusCode::BAD_REQUEST, "NO_FILE"),
            CommitError::StorageWrite { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, "UPLOAD_FAILED")
            }
            CommitError::TokenStore(_) | CommitError::ResourceStore { .. } => {
                tracing::error!("Record store error: {err}");
                Self::internal()
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}

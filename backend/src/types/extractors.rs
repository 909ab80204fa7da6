//! Custom extractors for request parsing
//!
//! Rejections are turned into `AppError` so every failure keeps the API error shape.

use std::convert::Infallible;
use std::sync::Arc;

use aide::operation::OperationInput;
use aide::OperationOutput;
use axum::{
    body::Bytes,
    extract::{
        rejection::JsonRejection, FromRequest, FromRequestParts, Multipart, Request,
    },
    http::{header::CONTENT_TYPE, request::Parts, StatusCode},
    Json,
};
use schemars::JsonSchema;
use validator::Validate;

use crate::tokens::TokenManager;
use crate::types::error::AppError;

/// Header carrying the root secret on token issuance
pub const ROOT_SECRET_HEADER: &str = "x-root-secret";

/// Header carrying the upload token on upload
pub const UPLOAD_TOKEN_HEADER: &str = "x-token";

/// Multipart field holding the uploaded file
pub const UPLOAD_FIELD: &str = "image";

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn body_error(status: StatusCode) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(status, "PAYLOAD_TOO_LARGE")
    } else {
        AppError::new(StatusCode::BAD_REQUEST, "INVALID_BODY")
    }
}

/// JSON extractor that validates the payload
///
/// Malformed bodies are reported as `INVALID_BODY`, rule violations with the
/// per-field `errors` list.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => AppError::new(
                    StatusCode::BAD_REQUEST,
                    "INVALID_CONTENT_TYPE",
                ),
                other => {
                    tracing::debug!("Rejected JSON body: {other}");
                    body_error(other.status())
                }
            })?;

        payload.validate()?;

        Ok(Self(payload))
    }
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        // Delegate to Json<T>'s implementation since ValidatedJson has the same structure
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        AppError::inferred_responses(ctx, operation)
    }
}

/// Proof that the request carries the root secret in `x-root-secret`
///
/// Rejects with `INVALID_SECRET` before the body is read, so key rules are
/// never reported to callers without the secret.
#[derive(Debug, Clone)]
pub struct RootSecret(pub String);

impl<S> FromRequestParts<S> for RootSecret
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token_manager = parts
            .extensions
            .get::<Arc<TokenManager>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("Token manager missing from request extensions");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            })?;

        let secret = header_value(parts, ROOT_SECRET_HEADER);
        token_manager.verify_secret(secret.as_deref())?;

        Ok(Self(secret.unwrap_or_default()))
    }
}

impl OperationInput for RootSecret {
    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        AppError::inferred_responses(ctx, operation)
    }
}

/// Value of the `x-token` header, if present
#[derive(Debug, Clone)]
pub struct UploadToken(pub Option<String>);

impl<S> FromRequestParts<S> for UploadToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header_value(parts, UPLOAD_TOKEN_HEADER)))
    }
}

impl OperationInput for UploadToken {}

/// Uploaded file bytes with the content type declared by the client
///
/// Read from a `multipart/form-data` body with an `image` file field, or from
/// a raw body. Raw bodies carry no declared type. A multipart body without the
/// file field yields empty data.
#[derive(Debug, Clone, Default)]
pub struct UploadBody {
    /// File content
    pub data: Bytes,
    /// MIME type declared on the multipart field
    pub declared_content_type: Option<String>,
}

impl UploadBody {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| body_error(err.status()))?
        {
            if field.name() != Some(UPLOAD_FIELD) {
                continue;
            }

            let declared_content_type = field.content_type().map(ToString::to_string);
            let data = field.bytes().await.map_err(|err| body_error(err.status()))?;

            return Ok(Self {
                data,
                declared_content_type,
            });
        }

        Ok(Self::default())
    }
}

/// Upload request whose body has not been read yet
///
/// The body is only buffered by [`PendingUpload::read`], once the caller has
/// checked the upload token.
pub struct PendingUpload(Request);

impl PendingUpload {
    /// Buffers the body, bounded by the router's body limit
    ///
    /// # Errors
    ///
    /// Returns `PAYLOAD_TOO_LARGE` if the body exceeds the limit
    /// Returns `INVALID_BODY` if the body cannot be read or parsed
    pub async fn read(self) -> Result<UploadBody, AppError> {
        let Self(req) = self;

        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, &())
                .await
                .map_err(|err| body_error(err.status()))?;
            return UploadBody::from_multipart(multipart).await;
        }

        let data = Bytes::from_request(req, &())
            .await
            .map_err(|err| body_error(err.status()))?;

        Ok(UploadBody {
            data,
            declared_content_type: None,
        })
    }
}

impl<S> FromRequest<S> for PendingUpload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(req))
    }
}

impl OperationInput for PendingUpload {
    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        AppError::inferred_responses(ctx, operation)
    }
}

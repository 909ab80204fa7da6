use std::sync::Arc;

use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::instrument;

use crate::{
    types::{AppError, PendingUpload, UploadToken},
    upload::CommitHandler,
};

#[derive(Debug, Serialize, JsonSchema)]
pub struct UploadResponse {
    /// Object key the file was written to
    pub key: String,
    /// Public URL of the uploaded file
    pub url: String,
}

/// Uploads a file under the key bound to the `x-token` header
///
/// The file is read from the `image` field of a multipart body, or from the
/// raw request body otherwise. The body is not read until the token is valid.
#[instrument(skip_all)]
pub async fn upload(
    Extension(commit_handler): Extension<Arc<CommitHandler>>,
    UploadToken(token): UploadToken,
    pending: PendingUpload,
) -> Result<Json<UploadResponse>, AppError> {
    let token = commit_handler.authorize(token.as_deref()).await?;

    let body = pending.read().await?;

    let receipt = commit_handler
        .commit(token, body.data, body.declared_content_type.as_deref())
        .await?;

    Ok(Json(UploadResponse {
        key: receipt.key,
        url: receipt.url,
    }))
}

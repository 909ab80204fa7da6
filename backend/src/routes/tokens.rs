use std::sync::Arc;

use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::{
    tokens::{validate_object_key, TokenManager},
    types::{AppError, RootSecret, ValidatedJson},
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateTokenRequest {
    /// Object key the token will upload to, e.g. `uploads/avatar.png`.
    /// Surrounding whitespace is trimmed.
    #[validate(custom(function = "validate_object_key"))]
    pub key: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CreateTokenResponse {
    /// 40-character lowercase hex token, valid for one hour
    pub token: String,
}

/// Issues an upload token bound to `key`
///
/// Requires the root secret in the `x-root-secret` header. The secret is
/// checked before the body is validated.
#[instrument(skip_all)]
pub async fn create_token(
    Extension(token_manager): Extension<Arc<TokenManager>>,
    RootSecret(secret): RootSecret,
    ValidatedJson(payload): ValidatedJson<CreateTokenRequest>,
) -> Result<Json<CreateTokenResponse>, AppError> {
    let token = token_manager.issue(Some(&secret), &payload.key).await?;

    Ok(Json(CreateTokenResponse { token: token.val }))
}

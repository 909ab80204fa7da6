use std::sync::Arc;

use aide::axum::IntoApiResponse;
use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;

use crate::tokens::TokenManager;

#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests
    status: &'static str,
    /// Service version
    semver: &'static str,
    /// Commit hash of the build, when known at compile time
    rev: Option<&'static str>,
    /// Whether a token is spent by its first successful upload
    single_use_tokens: bool,
}

/// Liveness check, never touches the stores
pub async fn handler(
    Extension(token_manager): Extension<Arc<TokenManager>>,
) -> impl IntoApiResponse {
    Json(HealthResponse {
        status: "ok",
        semver: env!("CARGO_PKG_VERSION"),
        rev: option_env!("GIT_REV"),
        single_use_tokens: token_manager.single_use(),
    })
}

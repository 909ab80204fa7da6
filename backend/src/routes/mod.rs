mod docs;
mod health;
pub mod tokens;
pub mod upload;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};

use crate::types::Environment;

/// Creates the router with all handler routes
///
/// API docs are only mounted where the environment allows them.
pub fn handler(environment: Environment) -> ApiRouter {
    let router = ApiRouter::new()
        .api_route("/health", get(health::handler))
        .api_route("/token", post(tokens::create_token))
        .api_route("/upload", post(upload::upload));

    if environment.show_api_docs() {
        router.merge(docs::handler())
    } else {
        router
    }
}

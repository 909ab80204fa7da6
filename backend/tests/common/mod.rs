// Not every utils is used in every test, so we allow dead code
#![allow(unused_imports, dead_code)]

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use backend::{
    bucket::memory::MemoryObjectStorage,
    server,
    tokens::TokenManager,
    types::{Config, Environment, ROOT_SECRET_HEADER, UPLOAD_TOKEN_HEADER},
    upload::CommitHandler,
};
use backend_storage::memory::{MemoryResourceStore, MemoryTokenStore};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

pub const ROOT_SECRET: &str = "test-root-secret";
pub const BUCKET: &str = "pickup-test";
pub const MULTIPART_BOUNDARY: &str = "pickup-test-boundary";

/// PNG signature followed by the start of an IHDR chunk
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
];

/// Initialize tracing for tests
pub fn setup_test_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn test_config(allow_token_reuse: bool, max_upload_bytes: Option<usize>) -> Config {
    let mut config = Config::from_lookup(|name| match name {
        "ROOT_SECRET" => Some(ROOT_SECRET.to_string()),
        "BUCKET" => Some(BUCKET.to_string()),
        "SECRET_KEY" => Some("test-secret-key".to_string()),
        "ACCESS_KEY" => Some("test-access-key".to_string()),
        _ => None,
    })
    .unwrap();
    config.allow_token_reuse = allow_token_reuse;
    if let Some(max_upload_bytes) = max_upload_bytes {
        config.max_upload_bytes = max_upload_bytes;
    }
    config
}

/// Router wired to in-memory stores
pub struct TestContext {
    pub router: Router,
    pub config: Arc<Config>,
    pub token_manager: Arc<TokenManager>,
    pub token_store: Arc<MemoryTokenStore>,
    pub resource_store: Arc<MemoryResourceStore>,
    pub object_storage: Arc<MemoryObjectStorage>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config(false, None))
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(Environment::Development, config)
    }

    pub fn with_environment(environment: Environment) -> Self {
        Self::build(environment, test_config(false, None))
    }

    fn build(environment: Environment, config: Config) -> Self {
        setup_test_tracing();

        let config = Arc::new(config);
        let token_store = Arc::new(MemoryTokenStore::new());
        let resource_store = Arc::new(MemoryResourceStore::new());
        let object_storage = Arc::new(MemoryObjectStorage::new());

        let token_manager = Arc::new(TokenManager::new(config.clone(), token_store.clone()));
        let commit_handler = Arc::new(CommitHandler::new(
            config.clone(),
            token_manager.clone(),
            object_storage.clone(),
            resource_store.clone(),
        ));

        let router = server::router(
            environment,
            &config,
            token_manager.clone(),
            commit_handler,
        );

        Self {
            router,
            config,
            token_manager,
            token_store,
            resource_store,
            object_storage,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn request_token(&self, secret: Option<&str>, key: &str) -> Response {
        let mut builder = Request::builder()
            .uri("/token")
            .method("POST")
            .header("Content-Type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(ROOT_SECRET_HEADER, secret);
        }

        self.send(
            builder
                .body(Body::from(json!({ "key": key }).to_string()))
                .unwrap(),
        )
        .await
    }

    /// Issues a token through the API and returns its value
    pub async fn issue_token(&self, key: &str) -> String {
        let response = self.request_token(Some(ROOT_SECRET), key).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        parse_response_body(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    pub async fn upload_raw(&self, token: Option<&str>, data: &[u8]) -> Response {
        let mut builder = Request::builder()
            .uri("/upload")
            .method("POST")
            .header("Content-Type", "application/octet-stream");
        if let Some(token) = token {
            builder = builder.header(UPLOAD_TOKEN_HEADER, token);
        }

        self.send(builder.body(Body::from(data.to_vec())).unwrap())
            .await
    }

    pub async fn upload_multipart(
        &self,
        token: Option<&str>,
        field: &str,
        content_type: &str,
        data: &[u8],
    ) -> Response {
        let mut builder = Request::builder()
            .uri("/upload")
            .method("POST")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(UPLOAD_TOKEN_HEADER, token);
        }

        let body = multipart_body(field, content_type, data);
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn get(&self, route: &str) -> Response {
        self.send(
            Request::builder()
                .uri(route)
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

/// Single-file multipart body using `MULTIPART_BOUNDARY`
pub fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Upload request declaring a multipart body that has no valid parts
pub fn garbage_multipart_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri("/upload")
        .method("POST")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(UPLOAD_TOKEN_HEADER, token);
    }

    builder
        .body(Body::from("this is not a multipart body"))
        .unwrap()
}

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

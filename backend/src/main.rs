use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use backend::{
    bucket::S3ObjectStorage,
    server,
    tokens::TokenManager,
    types::{Config, Environment},
    upload::CommitHandler,
};
use backend_storage::{counter::IdCounter, resource::ResourceStorage, token::TokenStorage};
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env()?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();

    // JSON logs in production, human readable logs in development
    match environment {
        Environment::Production => {
            fmt().json().with_env_filter(env_filter).init();
        }
        Environment::Development => {
            fmt().with_env_filter(env_filter).init();
        }
    }

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            tracing::error!("Invalid configuration: {err}");
            return Err(err.into());
        }
    };
    tracing::debug!(?config, "Loaded configuration");

    let aws_config = environment.aws_config().await;

    let s3_client = Arc::new(S3Client::from_conf(
        environment.s3_client_config(&aws_config, &config),
    ));
    let object_storage = Arc::new(S3ObjectStorage::new(s3_client, config.bucket.clone()));

    let dynamodb_client = Arc::new(DynamoDbClient::new(&aws_config));
    let counter = Arc::new(IdCounter::new(
        dynamodb_client.clone(),
        config.counters_table_name.clone(),
    ));
    let token_storage = Arc::new(TokenStorage::new(
        dynamodb_client.clone(),
        config.tokens_table_name.clone(),
        counter.clone(),
    ));
    let resource_storage = Arc::new(ResourceStorage::new(
        dynamodb_client,
        config.resources_table_name.clone(),
        counter,
    ));

    let token_manager = Arc::new(TokenManager::new(config.clone(), token_storage));
    let commit_handler = Arc::new(CommitHandler::new(
        config.clone(),
        token_manager.clone(),
        object_storage,
        resource_storage,
    ));

    server::start(environment, config, token_manager, commit_handler).await
}

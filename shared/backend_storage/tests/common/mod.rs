// Not every helper is used by every test binary
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use backend_storage::counter::{CounterAttribute, IdCounter};
use backend_storage::resource::{Resource, ResourceAttribute, ResourceStorage};
use backend_storage::token::{TokenAttribute, TokenStorage};
use uuid::Uuid;

/// Test configuration for LocalStack
const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";
const TEST_REGION: &str = "us-east-1";

/// Test context that creates fresh tables and cleans them up on drop
pub struct TestContext {
    pub tokens: TokenStorage,
    pub resources: ResourceStorage,
    dynamodb_client: Arc<DynamoDbClient>,
    resources_table: String,
    table_names: Vec<String>,
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let client = self.dynamodb_client.clone();
        let tables = self.table_names.clone();

        // Use tokio runtime to delete tables
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                for table in tables {
                    let _ = client.delete_table().table_name(&table).send().await;
                }
            });
        }
    }
}

impl TestContext {
    pub async fn new() -> Self {
        let credentials = Credentials::from_keys("test", "test", None);
        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(LOCALSTACK_ENDPOINT)
            .region(Region::new(TEST_REGION))
            .credentials_provider(credentials)
            .load()
            .await;

        let dynamodb_client = Arc::new(DynamoDbClient::new(&config));

        let counters_table = create_table(
            &dynamodb_client,
            "test-counters",
            &CounterAttribute::Name.to_string(),
            ScalarAttributeType::S,
        )
        .await;
        let tokens_table = create_table(
            &dynamodb_client,
            "test-tokens",
            &TokenAttribute::Val.to_string(),
            ScalarAttributeType::S,
        )
        .await;
        let resources_table = create_table(
            &dynamodb_client,
            "test-resources",
            &ResourceAttribute::Id.to_string(),
            ScalarAttributeType::N,
        )
        .await;

        // Wait a bit for tables to be ready
        tokio::time::sleep(Duration::from_millis(100)).await;

        let counter = Arc::new(IdCounter::new(
            dynamodb_client.clone(),
            counters_table.clone(),
        ));

        Self {
            tokens: TokenStorage::new(dynamodb_client.clone(), tokens_table.clone(), counter.clone()),
            resources: ResourceStorage::new(
                dynamodb_client.clone(),
                resources_table.clone(),
                counter,
            ),
            dynamodb_client,
            resources_table: resources_table.clone(),
            table_names: vec![counters_table, tokens_table, resources_table],
        }
    }

    /// Reads a resource row back; the service itself never reads resources
    pub async fn get_resource(&self, id: u64) -> Option<Resource> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.resources_table)
            .key(
                ResourceAttribute::Id.to_string(),
                AttributeValue::N(id.to_string()),
            )
            .consistent_read(true)
            .send()
            .await
            .expect("Failed to get resource");

        response
            .item()
            .map(|item| serde_dynamo::from_item(item.clone()).expect("Failed to parse resource"))
    }
}

async fn create_table(
    client: &DynamoDbClient,
    prefix: &str,
    partition_key: &str,
    key_type: ScalarAttributeType,
) -> String {
    let table_name = format!("{prefix}-{}", Uuid::new_v4());

    client
        .create_table()
        .table_name(&table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(partition_key)
                .attribute_type(key_type)
                .build()
                .unwrap(),
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(partition_key)
                .key_type(KeyType::Hash)
                .build()
                .unwrap(),
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .expect("Failed to create test table");

    table_name
}

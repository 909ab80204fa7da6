//! Resource storage using Dynamo DB
//!
//! A resource records that an upload token produced an object write. Rows are
//! append-only; the broker never updates or deletes them.

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::counter::IdCounter;

pub use error::{ResourceStorageError, ResourceStorageResult};

/// Name of the id counter used for resources
pub const RESOURCE_ID_COUNTER: &str = "resource";

/// Attribute names for the resources table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ResourceAttribute {
    /// Numeric resource id (Primary Key)
    Id,
    /// Object key that was written
    Key,
    /// Id of the token that authorized the write
    TokenId,
    /// Resolved content type
    ContentType,
    /// Creation timestamp
    CreatedAt,
}

/// Resource record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Monotonically assigned id
    pub id: u64,
    /// Object key written, equal to the owning token's key
    pub key: String,
    /// Id of the token that authorized the write
    pub token_id: u64,
    /// Content type the object was stored with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Data required to persist a new resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    /// Object key written
    pub key: String,
    /// Id of the authorizing token
    pub token_id: u64,
    /// Content type the object was stored with
    pub content_type: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Record store operations on resources
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Persists a new resource, assigning its id
    async fn insert(&self, resource: NewResource) -> ResourceStorageResult<Resource>;
}

/// Resource storage client for Dynamo DB operations
pub struct ResourceStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    counter: Arc<IdCounter>,
}

impl ResourceStorage {
    /// Creates a new resource storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for resources
    /// * `counter` - Id allocator shared with other record kinds
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        table_name: String,
        counter: Arc<IdCounter>,
    ) -> Self {
        Self {
            dynamodb_client,
            table_name,
            counter,
        }
    }
}

#[async_trait]
impl ResourceStore for ResourceStorage {
    async fn insert(&self, resource: NewResource) -> ResourceStorageResult<Resource> {
        let id = self.counter.next(RESOURCE_ID_COUNTER).await?;
        let resource = Resource {
            id,
            key: resource.key,
            token_id: resource.token_id,
            content_type: resource.content_type,
            created_at: resource.created_at,
        };

        let item = serde_dynamo::to_item(&resource)
            .map_err(|e| ResourceStorageError::SerializationError(e.to_string()))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await?;

        Ok(resource)
    }
}

//! Error types for resource storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use thiserror::Error;

use crate::counter::CounterError;

/// Result type for resource storage operations
pub type ResourceStorageResult<T> = Result<T, ResourceStorageError>;

/// Errors that can occur during resource storage operations
#[derive(Error, Debug)]
pub enum ResourceStorageError {
    /// Failed to insert resource into Dynamo DB
    #[error("Failed to insert resource into DynamoDB: {0}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to allocate a resource id
    #[error("Failed to allocate resource id: {0}")]
    IdAllocation(#[from] CounterError),

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

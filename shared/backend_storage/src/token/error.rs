//! Error types for upload token storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    get_item::GetItemError, put_item::PutItemError, update_item::UpdateItemError,
};
use thiserror::Error;

use crate::counter::CounterError;

/// Result type for token storage operations
pub type TokenStorageResult<T> = Result<T, TokenStorageError>;

/// Errors that can occur during token storage operations
#[derive(Error, Debug)]
pub enum TokenStorageError {
    /// Failed to insert token into Dynamo DB
    #[error("Failed to insert token into DynamoDB: {0}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to get token from Dynamo DB
    #[error("Failed to get token from DynamoDB: {0}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to update token in Dynamo DB
    #[error("Failed to update token in DynamoDB: {0}")]
    DynamoDbUpdateError(#[from] SdkError<UpdateItemError>),

    /// A token with the same value already exists
    #[error("Token already exists")]
    TokenExists,

    /// Failed to allocate a token id
    #[error("Failed to allocate token id: {0}")]
    IdAllocation(#[from] CounterError),

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

//! Monotonic id allocation using a Dynamo DB counter table
//!
//! Every named counter is a single item whose `value` attribute is bumped with
//! an atomic `ADD` update expression.

use std::sync::Arc;

use aws_sdk_dynamodb::{
    error::SdkError,
    operation::update_item::UpdateItemError,
    types::{AttributeValue, ReturnValue},
    Client as DynamoDbClient,
};
use strum::Display;
use thiserror::Error;

/// Result type for counter operations
pub type CounterResult<T> = Result<T, CounterError>;

/// Errors that can occur while allocating ids
#[derive(Error, Debug)]
pub enum CounterError {
    /// Failed to increment the counter item
    #[error("Failed to increment counter in DynamoDB: {0}")]
    DynamoDbUpdateError(#[from] SdkError<UpdateItemError>),

    /// Dynamo DB did not return the updated value
    #[error("Counter {0} returned no value")]
    MissingValue(String),

    /// The stored value is not an unsigned integer
    #[error("Counter {name} holds a malformed value: {value}")]
    MalformedValue {
        /// Counter name
        name: String,
        /// Raw attribute value
        value: String,
    },
}

/// Attribute names for the counters table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CounterAttribute {
    /// Counter name (Primary Key)
    Name,
    /// Last allocated value
    Value,
}

/// Atomic id allocator
pub struct IdCounter {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl IdCounter {
    /// Creates a new id counter
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table holding one item per counter
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    /// Allocates the next id for the named counter, starting at 1
    ///
    /// # Errors
    ///
    /// Returns `CounterError` if the update fails or the stored value is unusable
    pub async fn next(&self, name: &str) -> CounterResult<u64> {
        let response = self
            .dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(
                CounterAttribute::Name.to_string(),
                AttributeValue::S(name.to_string()),
            )
            .update_expression("ADD #value :one")
            .expression_attribute_names("#value", CounterAttribute::Value.to_string())
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await?;

        let value = response
            .attributes()
            .and_then(|attributes| attributes.get(&CounterAttribute::Value.to_string()))
            .ok_or_else(|| CounterError::MissingValue(name.to_string()))?;

        match value {
            AttributeValue::N(raw) => raw.parse().map_err(|_| CounterError::MalformedValue {
                name: name.to_string(),
                value: raw.clone(),
            }),
            other => Err(CounterError::MalformedValue {
                name: name.to_string(),
                value: format!("{other:?}"),
            }),
        }
    }
}

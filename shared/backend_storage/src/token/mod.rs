//! Upload token storage using Dynamo DB
//!
//! Tokens are keyed by their `val`, so the upload path resolves a token with a
//! single `GetItem`. The `consumed_at` attribute marks a token claimed by an
//! in-flight or finished commit.

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{error::SdkError, types::AttributeValue, Client as DynamoDbClient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::counter::IdCounter;

pub use error::{TokenStorageError, TokenStorageResult};

/// Name of the id counter used for tokens
pub const TOKEN_ID_COUNTER: &str = "token";

/// Attribute names for the tokens table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TokenAttribute {
    /// Token value (Primary Key)
    Val,
    /// Numeric token id
    Id,
    /// Object key the token authorizes
    Key,
    /// Expiry timestamp
    ExpireIn,
    /// Issuance timestamp
    CreatedAt,
    /// Timestamp of the commit that claimed the token
    ConsumedAt,
}

/// Upload token record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Monotonically assigned id
    pub id: u64,
    /// Object key this token authorizes writing to
    pub key: String,
    /// Bearer credential presented on upload
    pub val: String,
    /// Instant from which the token is no longer valid
    pub expire_in: DateTime<Utc>,
    /// Issuance time
    pub created_at: DateTime<Utc>,
    /// Set while a commit holds the token, and kept after a successful one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<DateTime<Utc>>,
}

/// Data required to persist a new token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewToken {
    /// Object key the token authorizes
    pub key: String,
    /// Random bearer credential
    pub val: String,
    /// Expiry timestamp
    pub expire_in: DateTime<Utc>,
    /// Issuance time
    pub created_at: DateTime<Utc>,
}

/// Record store operations on upload tokens
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persists a new token, assigning its id
    async fn insert(&self, token: NewToken) -> TokenStorageResult<Token>;

    /// Finds a token by exact value
    async fn get_by_val(&self, val: &str) -> TokenStorageResult<Option<Token>>;

    /// Atomically marks an unconsumed token as consumed
    ///
    /// Returns `false` when the token does not exist or was already consumed.
    async fn claim(&self, val: &str, at: DateTime<Utc>) -> TokenStorageResult<bool>;

    /// Clears a previous claim so the token can be used again
    async fn release(&self, val: &str) -> TokenStorageResult<()>;
}

/// Token storage client for Dynamo DB operations
pub struct TokenStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    counter: Arc<IdCounter>,
}

impl TokenStorage {
    /// Creates a new token storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for tokens
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
impl TokenStore for TokenStorage {
    async fn insert(&self, token: NewToken) -> TokenStorageResult<Token> {
        let id = self.counter.next(TOKEN_ID_COUNTER).await?;
        let token = Token {
            id,
            key: token.key,
            val: token.val,
            expire_in: token.expire_in,
            created_at: token.created_at,
            consumed_at: None,
        };

        let item = serde_dynamo::to_item(&token)
            .map_err(|e| TokenStorageError::SerializationError(e.to_string()))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", TokenAttribute::Val.to_string())
            .send()
            .await
            .map_err(|err| {
                if matches!(
                    err,
                    SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
                ) {
                    TokenStorageError::TokenExists
                } else {
                    err.into()
                }
            })?;

        Ok(token)
    }

    async fn get_by_val(&self, val: &str) -> TokenStorageResult<Option<Token>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                TokenAttribute::Val.to_string(),
                AttributeValue::S(val.to_string()),
            )
            .consistent_read(true)
            .send()
            .await?;

        let item = response
            .item()
            .map(|item| serde_dynamo::from_item(item.clone()))
            .transpose()
            .map_err(|e| TokenStorageError::SerializationError(e.to_string()))?;

        Ok(item)
    }

    async fn claim(&self, val: &str, at: DateTime<Utc>) -> TokenStorageResult<bool> {
        let result = self
            .dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(
                TokenAttribute::Val.to_string(),
                AttributeValue::S(val.to_string()),
            )
            .update_expression("SET #consumed_at = :consumed_at")
            .condition_expression("attribute_exists(#pk) AND attribute_not_exists(#consumed_at)")
            .expression_attribute_names("#pk", TokenAttribute::Val.to_string())
            .expression_attribute_names("#consumed_at", TokenAttribute::ConsumedAt.to_string())
            .expression_attribute_values(":consumed_at", AttributeValue::S(at.to_rfc3339()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(ref svc))
                if svc.err().is_conditional_check_failed_exception() =>
            {
                tracing::debug!("Token claim rejected, already consumed or missing");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn release(&self, val: &str) -> TokenStorageResult<()> {
        // Guard on existence so a stray release never upserts a bare item
        let result = self
            .dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(
                TokenAttribute::Val.to_string(),
                AttributeValue::S(val.to_string()),
            )
            .update_expression("REMOVE #consumed_at")
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", TokenAttribute::Val.to_string())
            .expression_attribute_names("#consumed_at", TokenAttribute::ConsumedAt.to_string())
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(ref svc))
                if svc.err().is_conditional_check_failed_exception() =>
            {
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

//! Upload commit protocol
//!
//! An upload is authorized first, before its body is read. The commit then
//! sniffs the content type, writes the object and only then records the
//! resource. With single-use tokens the token is claimed
//! before the write and the claim is released if the write fails, so at most
//! one commit per token can succeed.
mod sniff;

use std::sync::Arc;

use axum::body::Bytes;
use backend_storage::resource::{NewResource, ResourceStorageError, ResourceStore};
use backend_storage::token::{Token, TokenStorageError};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use crate::bucket::{BucketError, ObjectMetadata, ObjectStorage};
use crate::tokens::TokenManager;
use crate::types::Config;

pub use sniff::resolve_content_type;

/// Errors raised by a commit
#[derive(Error, Debug)]
pub enum CommitError {
    /// Token is absent, unknown, expired or already consumed
    #[error("INVALID_TOKEN")]
    TokenInvalid,

    /// No bytes were uploaded
    #[error("NO_FILE")]
    EmptyPayload,

    /// The object store rejected the write
    #[error("Failed to write object {key}: {source}")]
    StorageWrite {
        /// Target object key
        key: String,
        /// Underlying bucket error
        #[source]
        source: BucketError,
    },

    /// The token record store failed
    #[error("Token store error: {0}")]
    TokenStore(#[from] TokenStorageError),

    /// The object was written but its resource could not be recorded
    #[error("Failed to record resource for {key}: {source}")]
    ResourceStore {
        /// Object key that was written
        key: String,
        /// Underlying storage error
        #[source]
        source: ResourceStorageError,
    },
}

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Object key that was written
    pub key: String,
    /// Public URL of the object
    pub url: String,
}

/// Writes uploaded files and records them as resources
pub struct CommitHandler {
    config: Arc<Config>,
    token_manager: Arc<TokenManager>,
    object_storage: Arc<dyn ObjectStorage>,
    resource_store: Arc<dyn ResourceStore>,
}

impl CommitHandler {
    /// Creates a new commit handler
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        token_manager: Arc<TokenManager>,
        object_storage: Arc<dyn ObjectStorage>,
        resource_store: Arc<dyn ResourceStore>,
    ) -> Self {
        Self {
            config,
            token_manager,
            object_storage,
            resource_store,
        }
    }

    /// Resolves the token an upload is made with
    ///
    /// # Errors
    ///
    /// See [`Self::authorize_at`]
    pub async fn authorize(&self, token_val: Option<&str>) -> Result<Token, CommitError> {
        self.authorize_at(token_val, Utc::now()).await
    }

    /// Resolves the token as if the request arrived at `now`
    ///
    /// Runs before the upload body is read.
    ///
    /// # Errors
    ///
    /// Returns `CommitError::TokenInvalid` if the token is missing, unknown, expired or consumed
    /// Returns `CommitError::TokenStore` if the record store fails
    pub async fn authorize_at(
        &self,
        token_val: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Token, CommitError> {
        let Some(token_val) = token_val else {
            return Err(CommitError::TokenInvalid);
        };

        let token = match self.token_manager.resolve(token_val).await? {
            Some(token) if !TokenManager::is_expired(&token, now) => token,
            _ => return Err(CommitError::TokenInvalid),
        };

        if self.token_manager.single_use() && token.consumed_at.is_some() {
            tracing::debug!(token_id = token.id, "Token already consumed");
            return Err(CommitError::TokenInvalid);
        }

        Ok(token)
    }

    /// Commits `data` under the key bound to an authorized `token`
    ///
    /// # Errors
    ///
    /// See [`Self::commit_at`]
    pub async fn commit(
        &self,
        token: Token,
        data: Bytes,
        declared_content_type: Option<&str>,
    ) -> Result<CommitReceipt, CommitError> {
        self.commit_at(token, data, declared_content_type, Utc::now())
            .await
    }

    /// Commits `data` as if the body finished arriving at `now`
    ///
    /// # Errors
    ///
    /// Returns `CommitError::EmptyPayload` if `data` is empty
    /// Returns `CommitError::TokenInvalid` if a concurrent commit consumed the token first
    /// Returns `CommitError::StorageWrite` if the object store fails; no resource is recorded
    /// Returns `CommitError::TokenStore` or `CommitError::ResourceStore` if the record store fails
    #[instrument(skip_all, fields(token_id = token.id, size = data.len()))]
    pub async fn commit_at(
        &self,
        token: Token,
        data: Bytes,
        declared_content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CommitReceipt, CommitError> {
        if data.is_empty() {
            return Err(CommitError::EmptyPayload);
        }

        let content_type = resolve_content_type(&data, declared_content_type);
        tracing::debug!(key = %token.key, ?content_type, "Resolved content type");

        let single_use = self.token_manager.single_use();
        if single_use && !self.token_manager.claim(&token, now).await? {
            tracing::debug!("Lost claim race for token");
            return Err(CommitError::TokenInvalid);
        }

        let metadata = ObjectMetadata::public(content_type.clone());

        if let Err(source) = self
            .object_storage
            .put_object(&token.key, data, &metadata)
            .await
        {
            tracing::warn!("File {} of {} failed: {source}", token.key, token.id);

            if single_use {
                if let Err(err) = self.token_manager.release(&token).await {
                    tracing::error!("Failed to release token claim: {err}");
                }
            }

            return Err(CommitError::StorageWrite {
                key: token.key,
                source,
            });
        }

        let resource = self
            .resource_store
            .insert(NewResource {
                key: token.key.clone(),
                token_id: token.id,
                content_type,
                created_at: now,
            })
            .await
            .map_err(|source| {
                tracing::error!(
                    key = %token.key,
                    "Object written but resource not recorded: {source}"
                );
                CommitError::ResourceStore {
                    key: token.key.clone(),
                    source,
                }
            })?;

        tracing::info!(
            resource_id = resource.id,
            "File {} uploaded successfully.",
            token.key
        );

        Ok(CommitReceipt {
            url: self.config.public_url(&token.key),
            key: token.key,
        })
    }
}

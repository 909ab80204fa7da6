//! Upload token issuance and validation
mod key;

use std::sync::Arc;

use backend_storage::token::{NewToken, Token, TokenStorageError, TokenStore};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::instrument;

use crate::types::Config;

pub use key::{validate_key, validate_object_key, KeyError};

/// Lifetime of an issued token
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Random bytes behind a token value, hex encoded to 40 characters
const TOKEN_BYTES: usize = 20;

/// Errors raised while issuing a token
#[derive(Error, Debug)]
pub enum IssueError {
    /// Requester secret does not match the root secret
    #[error("INVALID_SECRET")]
    InvalidSecret,

    /// Requested key violates the key format
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    /// Token could not be persisted
    #[error("Failed to persist token: {0}")]
    TokenStore(#[from] TokenStorageError),
}

/// Generates a fresh token value from OS randomness
#[must_use]
pub fn generate_token_value() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Issues upload tokens and resolves them on use
pub struct TokenManager {
    config: Arc<Config>,
    token_store: Arc<dyn TokenStore>,
}

impl TokenManager {
    /// Creates a new token manager
    #[must_use]
    pub fn new(config: Arc<Config>, token_store: Arc<dyn TokenStore>) -> Self {
        Self {
            config,
            token_store,
        }
    }

    /// Issues a token for `key`, valid for one hour from now
    ///
    /// # Errors
    ///
    /// See [`Self::issue_at`]
    pub async fn issue(&self, secret: Option<&str>, key: &str) -> Result<Token, IssueError> {
        self.issue_at(secret, key, Utc::now()).await
    }

    /// Issues a token for `key` as if the request arrived at `now`
    ///
    /// The secret is checked before the key so unauthenticated callers learn
    /// nothing about the key rules.
    ///
    /// # Errors
    ///
    /// Returns `IssueError::InvalidSecret` if `secret` is absent or wrong
    /// Returns `IssueError::InvalidKey` if `key` violates the key format
    /// Returns `IssueError::TokenStore` if the record store fails
    #[instrument(skip(self, secret))]
    pub async fn issue_at(
        &self,
        secret: Option<&str>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Token, IssueError> {
        self.verify_secret(secret)?;

        let key = validate_key(key)?;

        let token = self
            .token_store
            .insert(NewToken {
                key: key.to_string(),
                val: generate_token_value(),
                expire_in: now + Duration::seconds(TOKEN_TTL_SECS),
                created_at: now,
            })
            .await?;

        tracing::info!(token_id = token.id, key = %token.key, "Issued upload token");

        Ok(token)
    }

    /// Looks a token up by its exact value
    ///
    /// # Errors
    ///
    /// Returns `TokenStorageError` if the record store fails
    pub async fn resolve(&self, val: &str) -> Result<Option<Token>, TokenStorageError> {
        self.token_store.get_by_val(val).await
    }

    /// Whether `token` is no longer valid at `now`
    #[must_use]
    pub fn is_expired(token: &Token, now: DateTime<Utc>) -> bool {
        now >= token.expire_in
    }

    /// Whether a token may back only one successful commit
    #[must_use]
    pub fn single_use(&self) -> bool {
        !self.config.allow_token_reuse
    }

    /// Marks a token consumed, returning `false` if another commit holds it
    ///
    /// # Errors
    ///
    /// Returns `TokenStorageError` if the record store fails
    pub async fn claim(&self, token: &Token, now: DateTime<Utc>) -> Result<bool, TokenStorageError> {
        self.token_store.claim(&token.val, now).await
    }

    /// Returns a claimed token to the usable state
    ///
    /// # Errors
    ///
    /// Returns `TokenStorageError` if the record store fails
    pub async fn release(&self, token: &Token) -> Result<(), TokenStorageError> {
        self.token_store.release(&token.val).await
    }

    /// Checks a requester secret against the root secret in constant time
    ///
    /// # Errors
    ///
    /// Returns `IssueError::InvalidSecret` if `secret` is absent or wrong
    pub fn verify_secret(&self, secret: Option<&str>) -> Result<(), IssueError> {
        let matches = secret.is_some_and(|secret| {
            bool::from(self.config.root_secret.as_bytes().ct_eq(secret.as_bytes()))
        });

        if matches {
            Ok(())
        } else {
            Err(IssueError::InvalidSecret)
        }
    }
}

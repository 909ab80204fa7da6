//! In-memory record stores for tests

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::counter::CounterError;
use crate::resource::{
    NewResource, Resource, ResourceStorageError, ResourceStorageResult, ResourceStore,
    RESOURCE_ID_COUNTER,
};
use crate::token::{NewToken, Token, TokenStorageError, TokenStorageResult, TokenStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Token store holding records in a vector, ids assigned from its length
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Vec<Token>>,
}

impl MemoryTokenStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored token
    #[must_use]
    pub fn tokens(&self) -> Vec<Token> {
        lock(&self.tokens).clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, token: NewToken) -> TokenStorageResult<Token> {
        let mut tokens = lock(&self.tokens);
        if tokens.iter().any(|existing| existing.val == token.val) {
            return Err(TokenStorageError::TokenExists);
        }

        let token = Token {
            id: tokens.len() as u64 + 1,
            key: token.key,
            val: token.val,
            expire_in: token.expire_in,
            created_at: token.created_at,
            consumed_at: None,
        };
        tokens.push(token.clone());
        Ok(token)
    }

    async fn get_by_val(&self, val: &str) -> TokenStorageResult<Option<Token>> {
        Ok(lock(&self.tokens)
            .iter()
            .find(|token| token.val == val)
            .cloned())
    }

    async fn claim(&self, val: &str, at: DateTime<Utc>) -> TokenStorageResult<bool> {
        let mut tokens = lock(&self.tokens);
        match tokens.iter_mut().find(|token| token.val == val) {
            Some(token) if token.consumed_at.is_none() => {
                token.consumed_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, val: &str) -> TokenStorageResult<()> {
        if let Some(token) = lock(&self.tokens).iter_mut().find(|token| token.val == val) {
            token.consumed_at = None;
        }
        Ok(())
    }
}

/// Resource store holding records in a vector
#[derive(Default)]
pub struct MemoryResourceStore {
    resources: Mutex<Vec<Resource>>,
    fail_inserts: AtomicBool,
}

impl MemoryResourceStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent inserts fail as if id allocation were unavailable
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every stored resource
    #[must_use]
    pub fn resources(&self) -> Vec<Resource> {
        lock(&self.resources).clone()
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn insert(&self, resource: NewResource) -> ResourceStorageResult<Resource> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(ResourceStorageError::IdAllocation(
                CounterError::MissingValue(RESOURCE_ID_COUNTER.to_string()),
            ));
        }

        let mut resources = lock(&self.resources);
        let resource = Resource {
            id: resources.len() as u64 + 1,
            key: resource.key,
            token_id: resource.token_id,
            content_type: resource.content_type,
            created_at: resource.created_at,
        };
        resources.push(resource.clone());
        Ok(resource)
    }
}

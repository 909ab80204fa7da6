//! Pickup uploader service
//!
//! Issues short-lived upload tokens bound to an object key and accepts file
//! uploads against them into public object storage.

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]
#![warn(missing_docs)]

/// Object storage writes
pub mod bucket;

/// HTTP routes
pub mod routes;

/// Server bootstrap
pub mod server;

/// Upload token issuance and validation
pub mod tokens;

/// Shared types: configuration, environment, errors and extractors
pub mod types;

/// Upload commit protocol
pub mod upload;

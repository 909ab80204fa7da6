//! Record storage for the upload broker
//!
//! Upload tokens and the resources they produced are persisted in Dynamo DB.
//! Numeric ids for both come from a shared atomic counter table, so they are
//! assigned monotonically across service instances.

pub mod counter;
pub mod resource;
pub mod token;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

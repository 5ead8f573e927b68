//! Error taxonomy for the routing layer.
//!
//! Two families of failures exist:
//! - **User errors**: the request itself cannot be satisfied (unknown key,
//!   unknown shard id, unrecognized strategy). Mapped to 4xx.
//! - **Dependency errors**: a shard is administratively disabled or cannot be
//!   reached over the network. Mapped to 5xx, always carrying the shard id
//!   and the underlying cause.

use axum::http::StatusCode;
use thiserror::Error;

use crate::resolver::{Key, ShardId};

#[derive(Debug, Error)]
pub enum RouterError {
    /// The key does not resolve to any shard under the active strategy.
    #[error("key {0} not found")]
    KeyNotFound(Key),

    /// The shard id is not part of the configured topology.
    #[error("shard {0} not found")]
    ShardNotFound(ShardId),

    /// The strategy value is not one of hash, range, lookup.
    #[error("unknown strategy '{0}', expected one of: hash, range, lookup")]
    InvalidStrategy(String),

    /// The shard is administratively disabled; no network call was attempted.
    #[error("shard {0} is currently disabled")]
    ShardDisabled(ShardId),

    /// The shard could not be reached or answered with a failure.
    #[error("shard {shard} unavailable: {cause}")]
    ShardUnavailable { shard: ShardId, cause: String },
}

impl RouterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::KeyNotFound(_) | RouterError::ShardNotFound(_) => StatusCode::NOT_FOUND,
            RouterError::InvalidStrategy(_) => StatusCode::BAD_REQUEST,
            RouterError::ShardDisabled(_) | RouterError::ShardUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

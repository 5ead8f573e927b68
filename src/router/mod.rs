//! Shard Router Module
//!
//! Orchestrates every operation against the shard fleet.
//!
//! ## Core Concepts
//! - **Single-key fetch**: resolve the owning shard, fail fast if it is
//!   administratively disabled, otherwise issue exactly one timed downstream
//!   call. No retries; a failed attempt is terminal for the request.
//! - **Fan-out aggregation**: one concurrent probe per configured shard, each
//!   with its own timeout. One shard's failure never delays or aborts the
//!   others, and the aggregate always carries exactly one outcome per shard.
//! - **Admin state**: the disabled-set and the active strategy live on the
//!   router instance (never in globals), mutate in place, and reset on
//!   restart.
//!
//! ## Submodules
//! - **`core`**: The `ShardRouter` itself.
//! - **`handlers`**: HTTP request handlers for the axum server.
//! - **`protocol`**: Wire DTOs and downstream endpoint paths.

pub mod core;
pub mod handlers;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use self::core::{BaselineComparison, FetchResult, RouterTimeouts, ShardOutcome, ShardRouter};

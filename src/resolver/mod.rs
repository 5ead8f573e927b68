//! Shard Resolution Module
//!
//! The leaf of the system: pure placement logic that maps a record key to the
//! shard that owns it. No network state, no topology knowledge beyond the
//! shard count.
//!
//! ## Strategies
//! - **Hash**: SHA-1 of the key's decimal representation, reduced modulo the
//!   shard count. Stable across restarts and implementations, which is what
//!   lets the router agree with the offline loader about placement.
//! - **Range**: contiguous buckets over a fixed key domain, last bucket
//!   absorbing the remainder.
//! - **Lookup**: explicit key -> shard table; a miss is the `Unresolved`
//!   outcome, not an error.
//!
//! Switching strategies is a routing-policy change only. Records already
//! placed under the old strategy are not moved, so a switch can make them
//! unreachable at their newly computed shard. That gap is inherent to the
//! design and callers are expected to know it.

pub mod placement;
pub mod strategy;


pub use placement::{hash_shard, range_shard, resolve, LookupTable, Resolution, DOMAIN_SIZE};
pub use strategy::Strategy;

/// Identifier of a shard within the topology.
pub type ShardId = u32;

/// Logical record key.
pub type Key = u64;

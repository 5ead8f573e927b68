//! Router Wire Protocol
//!
//! Downstream endpoint paths every shard backend must serve, and the DTOs
//! exchanged with clients of the router itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolver::ShardId;

// --- Downstream endpoints (shard backend contract) ---

/// Record retrieval: `GET {endpoint}/get/{key}` -> 200 + record, or 404.
pub const SHARD_ENDPOINT_GET: &str = "/get";
/// Record count: `GET {endpoint}/count` -> 200 + `{"count": n}`.
pub const SHARD_ENDPOINT_COUNT: &str = "/count";
/// Liveness: `GET {endpoint}/health` -> 200 when the shard is serving.
pub const SHARD_ENDPOINT_HEALTH: &str = "/health";

// --- Data Transfer Objects ---

/// Successful single-key fetch: the record, where it came from and how long
/// the downstream call took.
#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub data: Value,
    pub shard: ShardId,
    pub time_ms: f64,
}

/// Body of a shard backend's `/count` reply.
#[derive(Debug, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Health classification of a shard as seen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardStatus {
    Active,
    Disabled,
    Error,
}

/// Per-shard entry of the `/distribution` aggregate.
#[derive(Debug, Serialize)]
pub struct DistributionEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: ShardStatus,
}

/// Per-shard entry of the `/shards/status` aggregate.
#[derive(Debug, Serialize)]
pub struct ShardStatusEntry {
    pub status: ShardStatus,
    pub url: String,
}

/// Client request to switch the placement strategy. Carried as a raw string
/// so an unknown value surfaces as 400 with the taxonomy's message instead
/// of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SetStrategyRequest {
    pub strategy: String,
}

/// Echo of the accepted (or currently active) strategy.
#[derive(Debug, Serialize)]
pub struct StrategyResponse {
    pub strategy: String,
}

/// Acknowledgment of an enable/disable toggle, with the updated membership.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub message: String,
    pub disabled_shards: Vec<ShardId>,
}

/// Result of the sharded-versus-reference comparison.
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub sharded: Value,
    pub full_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_error: Option<String>,
}

/// Uniform error body. Clients only ever see `{"detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

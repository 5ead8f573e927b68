//! Startup Configuration
//!
//! Loads the static shard map once at process start and builds the immutable
//! [`ShardTopology`] every routing decision is checked against. Nothing here
//! mutates at runtime; operator-controlled state (strategy, disabled shards)
//! lives on the router and resets on restart.
//!
//! Expected file shape (JSON object keys are strings on the wire, parsed to
//! shard ids on load):
//!
//! ```json
//! {
//!   "shards": { "0": "http://shard0:8000", "1": "http://shard1:8000" },
//!   "full_db": "http://fulldb:8000",
//!   "default_strategy": "hash"
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::resolver::{ShardId, Strategy};

/// Immutable shard id -> endpoint mapping, built once from configuration.
///
/// Every shard id referenced anywhere in the system must be a key of this
/// map, otherwise the operation fails with `ShardNotFound`.
#[derive(Debug, Clone)]
pub struct ShardTopology {
    endpoints: BTreeMap<ShardId, String>,
}

impl ShardTopology {
    pub fn new(endpoints: BTreeMap<ShardId, String>) -> Self {
        Self { endpoints }
    }

    pub fn endpoint(&self, shard: ShardId) -> Option<&str> {
        self.endpoints.get(&shard).map(String::as_str)
    }

    pub fn contains(&self, shard: ShardId) -> bool {
        self.endpoints.contains_key(&shard)
    }

    pub fn shard_count(&self) -> u32 {
        self.endpoints.len() as u32
    }

    pub fn ids(&self) -> impl Iterator<Item = ShardId> + '_ {
        self.endpoints.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShardId, &str)> {
        self.endpoints
            .iter()
            .map(|(shard, url)| (*shard, url.as_str()))
    }
}

/// On-disk router configuration.
#[derive(Debug, Deserialize)]
pub struct RouterConfig {
    /// Shard id (stringly keyed in JSON) -> backend endpoint.
    pub shards: HashMap<String, String>,
    /// Endpoint of the non-sharded reference backend used by `/compare`.
    pub full_db: String,
    /// Strategy in effect at startup; defaults to hash.
    #[serde(default)]
    pub default_strategy: Option<Strategy>,
}

impl RouterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read shard map {}", path.display()))?;
        let config: RouterConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse shard map {}", path.display()))?;

        if config.shards.is_empty() {
            bail!("shard map {} defines no shards", path.display());
        }
        Ok(config)
    }

    /// Parses the stringly-keyed shard map into the runtime topology.
    pub fn topology(&self) -> Result<ShardTopology> {
        let mut endpoints = BTreeMap::new();
        for (raw_id, url) in &self.shards {
            let shard: ShardId = raw_id
                .parse()
                .with_context(|| format!("invalid shard id '{}' in shard map", raw_id))?;
            endpoints.insert(shard, normalize_endpoint(url));
        }
        Ok(ShardTopology::new(endpoints))
    }

    pub fn reference_endpoint(&self) -> String {
        normalize_endpoint(&self.full_db)
    }

    pub fn initial_strategy(&self) -> Strategy {
        self.default_strategy.unwrap_or(Strategy::Hash)
    }
}

/// Accepts both `host:port` and full URLs; deployments historically wrote the
/// reference backend without a scheme.
fn normalize_endpoint(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

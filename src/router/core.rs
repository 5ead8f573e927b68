use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use dashmap::DashSet;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

use super::protocol::{
    CountResponse, SHARD_ENDPOINT_COUNT, SHARD_ENDPOINT_GET, SHARD_ENDPOINT_HEALTH,
};
use crate::config::ShardTopology;
use crate::error::RouterError;
use crate::resolver::{resolve, Key, LookupTable, Resolution, ShardId, Strategy};

/// Per-call timeout bounds for downstream requests.
///
/// Health probes run on a shorter leash than data calls: a status page should
/// come back quickly even when a shard is wedged.
#[derive(Debug, Clone, Copy)]
pub struct RouterTimeouts {
    pub data: Duration,
    pub count: Duration,
    pub health: Duration,
}

impl Default for RouterTimeouts {
    fn default() -> Self {
        Self {
            data: Duration::from_secs(3),
            count: Duration::from_secs(3),
            health: Duration::from_secs(2),
        }
    }
}

/// Successful single-key fetch.
#[derive(Debug)]
pub struct FetchResult {
    pub data: Value,
    pub shard: ShardId,
    pub time_ms: f64,
}

/// Per-shard outcome of a fan-out aggregation. Produced fresh per request,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardOutcome<T> {
    Active(T),
    Disabled,
    Unreachable(String),
}

/// Result of comparing a sharded fetch against the non-sharded reference
/// backend. The reference call's failure rides in `full_error` instead of
/// suppressing the sharded result.
#[derive(Debug)]
pub struct BaselineComparison {
    pub sharded: Result<FetchResult, RouterError>,
    pub full_time_ms: f64,
    pub full_error: Option<String>,
}

/// The routing layer in front of the shard fleet.
///
/// Owns the static topology, the operator-controlled disabled-set, the
/// process-wide strategy and one shared HTTP client. All mutable state lives
/// on the instance so multiple routers (or test instances) stay independent.
///
/// Admin toggles race benignly with in-flight resolutions: a request that
/// read the strategy before a switch completes under the old one. No
/// transactional guarantee is made across read-then-act sequences.
pub struct ShardRouter {
    topology: ShardTopology,
    strategy: RwLock<Strategy>,
    disabled: DashSet<ShardId>,
    lookup: LookupTable,
    http_client: reqwest::Client,
    reference_endpoint: String,
    timeouts: RouterTimeouts,
}

impl ShardRouter {
    pub fn new(topology: ShardTopology, reference_endpoint: String, strategy: Strategy) -> Self {
        Self {
            topology,
            strategy: RwLock::new(strategy),
            disabled: DashSet::new(),
            lookup: LookupTable::new(),
            http_client: reqwest::Client::new(),
            reference_endpoint,
            timeouts: RouterTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: RouterTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn topology(&self) -> &ShardTopology {
        &self.topology
    }

    pub fn lookup_table(&self) -> &LookupTable {
        &self.lookup
    }

    // --- Strategy administration ---

    pub async fn current_strategy(&self) -> Strategy {
        *self.strategy.read().await
    }

    /// Switches the placement strategy for all subsequent resolutions.
    ///
    /// A single atomic state write; already-resolved in-flight requests are
    /// not revisited, and no data moves between shards.
    pub async fn set_strategy(&self, strategy: Strategy) {
        let mut current = self.strategy.write().await;
        tracing::info!("Strategy switched from {} to {}", *current, strategy);
        *current = strategy;
    }

    // --- Disabled-set administration ---

    pub fn disabled_shards(&self) -> Vec<ShardId> {
        let mut shards: Vec<ShardId> = self.disabled.iter().map(|entry| *entry).collect();
        shards.sort_unstable();
        shards
    }

    /// Marks a shard administratively down. Idempotent; disabling a shard
    /// that is already disabled is a no-op success.
    pub fn disable(&self, shard: ShardId) -> Result<Vec<ShardId>, RouterError> {
        if !self.topology.contains(shard) {
            return Err(RouterError::ShardNotFound(shard));
        }
        if self.disabled.insert(shard) {
            tracing::warn!("Shard {} administratively disabled", shard);
        }
        Ok(self.disabled_shards())
    }

    /// Returns a shard to service. Idempotent; enabling an already-enabled
    /// shard is a no-op success.
    pub fn enable(&self, shard: ShardId) -> Result<Vec<ShardId>, RouterError> {
        if !self.topology.contains(shard) {
            return Err(RouterError::ShardNotFound(shard));
        }
        if self.disabled.remove(&shard).is_some() {
            tracing::info!("Shard {} re-enabled", shard);
        }
        Ok(self.disabled_shards())
    }

    // --- Single-key path ---

    /// Resolves a key to its owning shard under the current strategy.
    ///
    /// `Unresolved` becomes `KeyNotFound`; a resolved id missing from the
    /// topology (possible with a sparse shard map) becomes `ShardNotFound`.
    pub async fn resolve(&self, key: Key) -> Result<ShardId, RouterError> {
        let strategy = self.current_strategy().await;
        match resolve(key, strategy, self.topology.shard_count(), &self.lookup) {
            Resolution::Shard(shard) if self.topology.contains(shard) => Ok(shard),
            Resolution::Shard(shard) => Err(RouterError::ShardNotFound(shard)),
            Resolution::Unresolved => Err(RouterError::KeyNotFound(key)),
        }
    }

    /// Fetches a record from the shard that owns the key.
    ///
    /// Fails fast with `ShardDisabled` before any network activity when the
    /// owning shard is administratively down. Exactly one downstream attempt
    /// is made; failure or timeout is terminal for the request.
    pub async fn fetch_one(&self, key: Key) -> Result<FetchResult, RouterError> {
        let shard = self.resolve(key).await?;

        if self.disabled.contains(&shard) {
            return Err(RouterError::ShardDisabled(shard));
        }

        let endpoint = self
            .topology
            .endpoint(shard)
            .ok_or(RouterError::ShardNotFound(shard))?;
        let url = format!("{}{}/{}", endpoint, SHARD_ENDPOINT_GET, key);

        tracing::debug!("Key {} routed to shard {} ({})", key, shard, url);

        let start = Instant::now();
        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeouts.data)
            .send()
            .await
            .map_err(|e| RouterError::ShardUnavailable {
                shard,
                cause: e.to_string(),
            })?;
        let time_ms = start.elapsed().as_secs_f64() * 1000.0;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RouterError::KeyNotFound(key));
        }
        if !response.status().is_success() {
            return Err(RouterError::ShardUnavailable {
                shard,
                cause: format!("backend returned {}", response.status()),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| RouterError::ShardUnavailable {
                shard,
                cause: format!("invalid backend payload: {}", e),
            })?;

        Ok(FetchResult {
            data,
            shard,
            time_ms,
        })
    }

    // --- Fan-out path ---

    /// Runs one probe per configured shard concurrently and collects every
    /// outcome independently.
    ///
    /// Disabled shards short-circuit to `Disabled` without spawning a task.
    /// Each probe carries its own timeout; a failed, timed-out or panicked
    /// probe becomes that shard's `Unreachable` and never aborts or delays a
    /// sibling. The result always holds exactly one entry per known shard.
    async fn aggregate_all<T, F, Fut>(&self, probe: F) -> HashMap<ShardId, ShardOutcome<T>>
    where
        T: Send + 'static,
        F: Fn(ShardId, String) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut outcomes = HashMap::with_capacity(self.topology.shard_count() as usize);
        let mut probes = JoinSet::new();

        for (shard, endpoint) in self.topology.iter() {
            if self.disabled.contains(&shard) {
                outcomes.insert(shard, ShardOutcome::Disabled);
                continue;
            }
            let future = probe(shard, endpoint.to_string());
            probes.spawn(async move { (shard, future.await) });
        }

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((shard, Ok(value))) => {
                    outcomes.insert(shard, ShardOutcome::Active(value));
                }
                Ok((shard, Err(e))) => {
                    tracing::warn!("Shard {} probe failed: {}", shard, e);
                    outcomes.insert(shard, ShardOutcome::Unreachable(e.to_string()));
                }
                Err(e) => {
                    tracing::error!("Shard probe task aborted: {}", e);
                }
            }
        }

        // A probe task that panicked loses its shard tag in the join error;
        // backfill so the aggregate still covers the whole topology.
        for shard in self.topology.ids() {
            outcomes
                .entry(shard)
                .or_insert_with(|| ShardOutcome::Unreachable("probe task aborted".to_string()));
        }

        outcomes
    }

    /// Per-shard record counts, for the distribution view.
    pub async fn distribution(&self) -> HashMap<ShardId, ShardOutcome<u64>> {
        let client = self.http_client.clone();
        let timeout = self.timeouts.count;

        self.aggregate_all(move |_shard, endpoint| {
            let client = client.clone();
            async move {
                let response = client
                    .get(format!("{}{}", endpoint, SHARD_ENDPOINT_COUNT))
                    .timeout(timeout)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    anyhow::bail!("count request failed: {}", response.status());
                }
                let body: CountResponse = response.json().await?;
                Ok(body.count)
            }
        })
        .await
    }

    /// Per-shard liveness, for the status view. Best effort only: a healthy
    /// answer here says nothing about the shard a moment later.
    pub async fn shards_status(&self) -> HashMap<ShardId, ShardOutcome<()>> {
        let client = self.http_client.clone();
        let timeout = self.timeouts.health;

        self.aggregate_all(move |_shard, endpoint| {
            let client = client.clone();
            async move {
                let response = client
                    .get(format!("{}{}", endpoint, SHARD_ENDPOINT_HEALTH))
                    .timeout(timeout)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    anyhow::bail!("health check failed: {}", response.status());
                }
                Ok(())
            }
        })
        .await
    }

    // --- Cross-source comparison ---

    /// Times a reference-backend fetch against the sharded path for the same
    /// key. Both calls run concurrently; the reference body is discarded
    /// (only its latency matters) and its failure does not mask the sharded
    /// result.
    pub async fn compare_with_baseline(&self, key: Key) -> BaselineComparison {
        let reference = async {
            let url = format!("{}{}/{}", self.reference_endpoint, SHARD_ENDPOINT_GET, key);
            let start = Instant::now();
            let result = self
                .http_client
                .get(&url)
                .timeout(self.timeouts.data)
                .send()
                .await;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(_) => (elapsed_ms, None),
                Err(e) => (elapsed_ms, Some(format!("reference backend: {}", e))),
            }
        };

        let ((full_time_ms, full_error), sharded) = tokio::join!(reference, self.fetch_one(key));

        BaselineComparison {
            sharded,
            full_time_ms,
            full_error,
        }
    }
}

use dashmap::DashMap;
use sha1::{Digest, Sha1};

use super::strategy::Strategy;
use super::{Key, ShardId};

/// Size of the key domain partitioned by the range strategy.
pub const DOMAIN_SIZE: u64 = 10_000;

/// Outcome of a resolution attempt.
///
/// `Unresolved` is a normal result (a lookup-table miss), not a fault.
/// Callers translate it to their own not-found representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Shard(ShardId),
    Unresolved,
}

impl Resolution {
    pub fn shard(self) -> Option<ShardId> {
        match self {
            Resolution::Shard(id) => Some(id),
            Resolution::Unresolved => None,
        }
    }
}

/// Explicit key -> shard assignments consulted by [`Strategy::Lookup`].
///
/// Empty by default; there is no population endpoint in the routing core, so
/// until `assign` is called every lookup resolution is `Unresolved`.
/// In-memory only, reset on restart.
#[derive(Debug, Default)]
pub struct LookupTable {
    assignments: DashMap<Key, ShardId>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, key: Key, shard: ShardId) {
        self.assignments.insert(key, shard);
    }

    pub fn get(&self, key: Key) -> Option<ShardId> {
        self.assignments.get(&key).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Maps a key to its owning shard under the given strategy.
///
/// `shard_count` must be non-zero; the topology is validated at startup.
pub fn resolve(key: Key, strategy: Strategy, shard_count: u32, lookup: &LookupTable) -> Resolution {
    debug_assert!(shard_count > 0, "resolve called with empty topology");

    match strategy {
        Strategy::Hash => Resolution::Shard(hash_shard(key, shard_count)),
        Strategy::Range => Resolution::Shard(range_shard(key, shard_count)),
        Strategy::Lookup => match lookup.get(key) {
            Some(shard) => Resolution::Shard(shard),
            None => Resolution::Unresolved,
        },
    }
}

/// SHA-1 placement: digest of the key's decimal representation modulo the
/// shard count.
///
/// The full 160-bit digest is reduced byte by byte, which is equivalent to
/// interpreting it as a big-endian integer and taking the modulus. A fixed,
/// well-known digest keeps placement identical across processes and restarts;
/// a seeded default hasher would not.
pub fn hash_shard(key: Key, shard_count: u32) -> ShardId {
    let digest = Sha1::digest(key.to_string().as_bytes());
    let n = shard_count as u64;

    let mut rem = 0u64;
    for byte in digest {
        rem = ((rem << 8) | byte as u64) % n;
    }
    rem as ShardId
}

/// Range placement: contiguous buckets of `DOMAIN_SIZE / shard_count` keys,
/// the last bucket clamped to absorb the integer-division remainder.
///
/// Keys outside `[0, DOMAIN_SIZE)` still resolve into the last bucket rather
/// than being rejected. The permissiveness is deliberate: the routing layer
/// simulates placement policy and does not validate the key domain.
pub fn range_shard(key: Key, shard_count: u32) -> ShardId {
    let bucket = (DOMAIN_SIZE / shard_count as u64).max(1);
    (key / bucket).min(shard_count as u64 - 1) as ShardId
}

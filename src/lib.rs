//! Shard Router Library
//!
//! This library crate defines the core modules of the shard routing layer.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems, leaves first:
//!
//! - **`resolver`**: The placement engine. Pure functions mapping a record key
//!   to the shard that owns it under a selectable strategy (hash, range or
//!   lookup-table). Holds no network state.
//! - **`router`**: The orchestration layer. Owns the shard topology, the
//!   operator-controlled disabled-set and the HTTP client; performs single-key
//!   fetches, concurrent fan-out aggregation across all shards, and baseline
//!   comparison against a non-sharded reference backend.
//! - **`config`**: Startup configuration. Loads the static shard map
//!   (shard id -> endpoint URL) and the reference backend endpoint from a
//!   JSON file, once, at process start.
//! - **`error`**: The error taxonomy shared by resolver and router, with its
//!   mapping onto HTTP status codes.

pub mod config;
pub mod error;
pub mod resolver;
pub mod router;

//! Entry Store
//!
//! The store owns all entry state: a sharded, thread-safe map from byte keys
//! to byte values with optional expiration deadlines, plus the machinery
//! around it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │  ...64  │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │         Sweeper           │
//!              │  (background tokio task)  │
//!              └───────────────────────────┘
//! ```
//!
//! - [`engine`]: the sharded map and every per-key operation
//! - [`pattern`]: glob compilation and byte-wise matching for key scans
//! - [`sweeper`]: optional eager reclamation of expired entries
//!
//! Expiry is two-layered: lazy checks on every read path are the source of
//! truth, and the sweeper merely frees memory for entries nobody touches.

pub mod engine;
pub mod pattern;
pub mod sweeper;

pub use engine::{Entry, Store, StoreStats};
pub use pattern::{Pattern, PatternError};
pub use sweeper::{start_sweeper, SweepConfig, Sweeper};

//! # emberkv - An Embeddable In-Memory Key-Value Cache
//!
//! emberkv is the storage core of a remote cache: a single-node, in-memory
//! key-value store with millisecond-precision TTL expiration, atomic per-key
//! operations, and glob-based key enumeration that stays consistent under
//! concurrent mutation.
//!
//! It is deliberately a library. Network transport, connection management,
//! authentication, and pipelining all belong to whatever process embeds it;
//! the crate's contract ends at the [`commands::CommandEngine`] call surface,
//! which is safe to invoke from any number of concurrent tasks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            emberkv                               │
//! │                                                                  │
//! │   transport (external)                                           │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  ┌──────────────┐     ┌────────────────────────────────────────┐ │
//! │  │ CommandEngine│────>│                Store                   │ │
//! │  │  errors,     │     │  ┌────────┐ ┌────────┐ ┌────────┐      │ │
//! │  │  patterns,   │     │  │Shard 0 │ │Shard 1 │ │...64   │      │ │
//! │  │  ping        │     │  │RwLock  │ │RwLock  │ │shards  │      │ │
//! │  └──────────────┘     │  └────────┘ └────────┘ └────────┘      │ │
//! │                       └──────────────────┬─────────────────────┘ │
//! │                                          ▲                       │
//! │                       ┌──────────────────┴─────────────────────┐ │
//! │                       │                Sweeper                 │ │
//! │                       │         (background tokio task)        │ │
//! │                       └────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use emberkv::commands::CommandEngine;
//! use emberkv::store::Store;
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(Store::new());
//! let engine = CommandEngine::new(Arc::clone(&store));
//!
//! engine.set(Bytes::from("user:42"), Bytes::from("ember"), None);
//! assert_eq!(engine.get(&Bytes::from("user:42")), Some(Bytes::from("ember")));
//!
//! // Entries can carry a deadline as small as tens of milliseconds.
//! engine.set(
//!     Bytes::from("session:42"),
//!     Bytes::from("token"),
//!     Some(Duration::from_millis(100)),
//! );
//!
//! let keys = engine.keys_matching(b"user:*").unwrap();
//! assert_eq!(keys, vec![Bytes::from("user:42")]);
//! ```
//!
//! Inside a tokio runtime the optional sweeper reclaims expired entries that
//! nobody reads again:
//!
//! ```ignore
//! let _sweeper = emberkv::store::start_sweeper(Arc::clone(&store));
//! ```
//!
//! ## Module Overview
//!
//! - [`clock`]: the monotonic time source behind every deadline comparison
//! - [`store`]: the sharded entry store, glob matching, and the sweeper
//! - [`commands`]: the typed operation surface and error taxonomy
//!
//! ## Design Highlights
//!
//! ### Per-Key Linearizability
//!
//! Keys are spread over 64 independently locked shards. An operation on one
//! key takes only its shard's lock, so operations on distinct keys proceed
//! in parallel while operations on the same key serialize cleanly.
//!
//! ### Passive Expiry
//!
//! A deadline is a stored instant compared against the clock on access,
//! never a timer per key. Every read path re-checks liveness, so an expired
//! entry is indistinguishable from an absent one even before the background
//! sweeper physically reclaims it.
//!
//! ### Type-Agnostic Values
//!
//! Values are opaque bytes. Store `"2703"` and read it back as an integer,
//! or store a binary blob under a binary key; the engine never interprets
//! either side.

pub mod clock;
pub mod commands;
pub mod store;

// Re-export commonly used types for convenience
pub use clock::Clock;
pub use commands::{CommandEngine, CommandError, CommandResult, KeyType};
pub use store::{
    start_sweeper, Entry, Pattern, PatternError, Store, StoreStats, SweepConfig, Sweeper,
};

/// Version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

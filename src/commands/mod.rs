//! Command Layer
//!
//! The typed operation surface of the cache. A hosting process constructs a
//! [`CommandEngine`] over a shared store and exposes its methods however it
//! likes - a network listener, an embedded API, a test harness.
//!
//! ```text
//! Transport (external)
//!       │ decoded request
//!       ▼
//! ┌─────────────────┐
//! │  CommandEngine  │  errors, pattern compilation, ping
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │      Store      │  atomicity, expiry, enumeration
//! └─────────────────┘
//! ```

pub mod engine;

pub use engine::{CommandEngine, CommandError, CommandResult, KeyType};

//! Command Engine
//!
//! The operation surface a transport plugs into. Each method here is one of
//! the cache's commands, expressed as a typed call instead of a wire frame:
//! the listener that fronts this crate decodes client requests into these
//! calls and encodes the results back.
//!
//! Two rules shape the signatures:
//!
//! 1. **Absence is not an error.** `get`, `exists`, `key_type`, `delete` and
//!    friends report a missing key through `Option`/`bool`; only operations
//!    whose contract requires a live target (`rename`, `expire_after`) fail
//!    with [`CommandError::NotFound`].
//! 2. **Atomicity lives below.** Per-key linearizability is enforced by the
//!    store's shard locks; this layer adds the error taxonomy, pattern
//!    compilation, and the liveness ping, and never re-implements locking.

use crate::store::pattern::{Pattern, PatternError};
use crate::store::Store;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the command layer.
///
/// Absence on the read paths is deliberately *not* represented here, so a
/// caller can always tell "key not present" apart from "request failed".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The target key has no live entry, for commands that require one.
    #[error("no such key")]
    NotFound,

    /// A malformed glob pattern was supplied to a key scan.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),
}

/// Convenience alias for command results.
pub type CommandResult<T> = Result<T, CommandError>;

/// What kind of value a key holds.
///
/// The store keeps only scalar byte values, so the answer is binary: a live
/// entry is a scalar, anything else is absent. Distinct text and numeric
/// representations are not tracked as separate types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// A live scalar entry is present.
    Scalar,
    /// No live entry.
    Absent,
}

/// Executes cache commands against a shared [`Store`].
///
/// Cloning is cheap; each transport task can hold its own handle.
///
/// # Example
///
/// ```
/// use emberkv::commands::CommandEngine;
/// use emberkv::store::Store;
/// use bytes::Bytes;
/// use std::sync::Arc;
///
/// let engine = CommandEngine::new(Arc::new(Store::new()));
///
/// engine.set(Bytes::from("greeting"), Bytes::from("hello"), None);
/// assert_eq!(engine.get(&Bytes::from("greeting")), Some(Bytes::from("hello")));
/// ```
#[derive(Debug, Clone)]
pub struct CommandEngine {
    store: Arc<Store>,
}

impl CommandEngine {
    /// Creates a command engine over the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The store this engine executes against.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Returns the value at `key`, or `None` if absent or expired.
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        self.store.get(key)
    }

    /// Inserts or overwrites `key`.
    ///
    /// With `ttl` the entry expires that long from now; without it the entry
    /// is persistent, clearing any deadline a previous entry carried.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        match ttl {
            Some(ttl) => self.store.set_with_ttl(key, value, ttl),
            None => self.store.set(key, value),
        };
    }

    /// Atomically swaps in `value` and returns the prior live value.
    ///
    /// The replacement entry has no deadline.
    pub fn get_and_set(&self, key: Bytes, value: Bytes) -> Option<Bytes> {
        self.store.get_and_set(key, value)
    }

    /// Atomically removes `key` and returns its live value, if any.
    pub fn get_and_delete(&self, key: &Bytes) -> Option<Bytes> {
        self.store.get_and_delete(key)
    }

    /// True iff a live entry exists at `key`.
    pub fn exists(&self, key: &Bytes) -> bool {
        self.store.exists(key)
    }

    /// Removes `key`; returns whether anything was removed.
    ///
    /// Deleting an absent key is a normal `false`, not an error.
    pub fn delete(&self, key: &Bytes) -> bool {
        self.store.delete(key)
    }

    /// Moves the entry at `old_key` to `new_key`, deadline included.
    ///
    /// `new_key` is overwritten unconditionally. Fails with
    /// [`CommandError::NotFound`] when `old_key` has no live entry.
    pub fn rename(&self, old_key: &Bytes, new_key: Bytes) -> CommandResult<()> {
        if self.store.rename(old_key, new_key) {
            Ok(())
        } else {
            Err(CommandError::NotFound)
        }
    }

    /// Reports whether `key` holds a scalar or nothing.
    pub fn key_type(&self, key: &Bytes) -> KeyType {
        if self.store.exists(key) {
            KeyType::Scalar
        } else {
            KeyType::Absent
        }
    }

    /// Sets the deadline of an existing entry to `ttl` from now.
    ///
    /// Fails with [`CommandError::NotFound`] when the key is absent or
    /// already expired.
    pub fn expire_after(&self, key: &Bytes, ttl: Duration) -> CommandResult<()> {
        if self.store.expire_after(key, ttl) {
            Ok(())
        } else {
            Err(CommandError::NotFound)
        }
    }

    /// Remaining time to live at `key`.
    ///
    /// - `None` - no live entry
    /// - `Some(None)` - live entry without a deadline
    /// - `Some(Some(d))` - live entry expiring in `d`
    pub fn time_to_live(&self, key: &Bytes) -> Option<Option<Duration>> {
        self.store.ttl(key)
    }

    /// Clears the deadline at `key`; returns whether one was removed.
    pub fn persist(&self, key: &Bytes) -> bool {
        self.store.persist(key)
    }

    /// Returns every live key matching a glob pattern.
    ///
    /// Fails with [`CommandError::InvalidPattern`] before touching the store
    /// when the pattern does not compile.
    pub fn keys_matching(&self, pattern: &[u8]) -> CommandResult<Vec<Bytes>> {
        let pattern = Pattern::compile(pattern)?;
        Ok(self.store.keys_matching(&pattern))
    }

    /// Discards every entry in the store.
    pub fn flush_all(&self) {
        self.store.flush_all();
    }

    /// Approximate number of entries in the store.
    pub fn len(&self) -> u64 {
        self.store.len()
    }

    /// True if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Liveness check: always acknowledges, independent of store state.
    ///
    /// Carries no data contract beyond the acknowledgement; callers use it
    /// purely to validate connectivity.
    pub fn ping(&self) -> &'static str {
        "PONG"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn engine() -> CommandEngine {
        CommandEngine::new(Arc::new(Store::new()))
    }

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_never_written_key_is_absent() {
        let engine = engine();

        assert_eq!(engine.get(&key("never")), None);
        assert!(!engine.exists(&key("never")));
        assert_eq!(engine.key_type(&key("never")), KeyType::Absent);
    }

    #[test]
    fn test_set_get_string() {
        let engine = engine();

        engine.set(key("k"), Bytes::from("hello from the cache"), None);
        assert_eq!(
            engine.get(&key("k")),
            Some(Bytes::from("hello from the cache"))
        );
        assert!(engine.exists(&key("k")));
        assert_eq!(engine.time_to_live(&key("k")), Some(None));
    }

    #[test]
    fn test_set_get_byte_key() {
        let engine = engine();

        let k = Bytes::from_static(&[0x9f, 0x02, 0x00, 0xc4]);
        assert_eq!(engine.get(&k), None);
        engine.set(k.clone(), Bytes::from("byte key"), None);
        assert_eq!(engine.get(&k), Some(Bytes::from("byte key")));
    }

    #[test]
    fn test_set_get_integer_text() {
        let engine = engine();

        assert_eq!(engine.get(&key("n")), None);
        engine.set(key("n"), Bytes::from(2703.to_string()), None);

        let raw = engine.get(&key("n")).unwrap();
        let parsed: i32 = std::str::from_utf8(&raw).unwrap().parse().unwrap();
        assert_eq!(parsed, 2703);
    }

    #[test]
    fn test_set_with_ttl_expires() {
        let engine = engine();

        engine.set(
            key("x"),
            Bytes::from("hello"),
            Some(Duration::from_millis(100)),
        );

        thread::sleep(Duration::from_millis(10));
        assert_eq!(engine.get(&key("x")), Some(Bytes::from("hello")));
        assert!(engine.time_to_live(&key("x")).unwrap().is_some());

        thread::sleep(Duration::from_millis(140));
        assert_eq!(engine.get(&key("x")), None);
        assert!(!engine.exists(&key("x")));
    }

    #[test]
    fn test_expire_after_then_lapse() {
        let engine = engine();

        engine.set(key("k"), Bytes::from("Expire Test"), None);
        engine
            .expire_after(&key("k"), Duration::from_millis(100))
            .unwrap();

        assert_eq!(engine.get(&key("k")), Some(Bytes::from("Expire Test")));
        assert!(engine.time_to_live(&key("k")).unwrap().is_some());

        thread::sleep(Duration::from_millis(150));
        assert_eq!(engine.get(&key("k")), None);
    }

    #[test]
    fn test_expire_after_absent_key() {
        let engine = engine();

        assert_eq!(
            engine.expire_after(&key("missing"), Duration::from_secs(1)),
            Err(CommandError::NotFound)
        );
    }

    #[test]
    fn test_get_and_set_swaps_atomically() {
        let engine = engine();

        engine.set(key("k"), Bytes::from("v1"), Some(Duration::from_secs(100)));

        assert_eq!(
            engine.get_and_set(key("k"), Bytes::from("v2")),
            Some(Bytes::from("v1"))
        );
        assert_eq!(engine.get(&key("k")), Some(Bytes::from("v2")));
        // Deadline cleared by the swap.
        assert_eq!(engine.time_to_live(&key("k")), Some(None));
    }

    #[test]
    fn test_rename() {
        let engine = engine();

        engine.set(key("k1"), Bytes::from("v"), None);
        engine.rename(&key("k1"), key("k2")).unwrap();

        assert!(!engine.exists(&key("k1")));
        assert!(engine.exists(&key("k2")));
        assert_eq!(engine.get(&key("k2")), Some(Bytes::from("v")));

        assert_eq!(
            engine.rename(&key("k1"), key("k3")),
            Err(CommandError::NotFound)
        );
    }

    #[test]
    fn test_delete() {
        let engine = engine();

        engine.set(key("k"), Bytes::from("v"), None);
        assert!(engine.delete(&key("k")));
        assert!(!engine.exists(&key("k")));

        // Absent key: false, not an error.
        assert!(!engine.delete(&key("k")));
    }

    #[test]
    fn test_get_and_delete() {
        let engine = engine();

        engine.set(key("k"), Bytes::from("v"), None);
        assert_eq!(engine.get_and_delete(&key("k")), Some(Bytes::from("v")));
        assert_eq!(engine.get_and_delete(&key("k")), None);
    }

    #[test]
    fn test_key_type() {
        let engine = engine();

        engine.set(key("text"), Bytes::from("words"), None);
        engine.set(key("number"), Bytes::from("42"), None);

        // One logical type: text and numeric payloads are both scalars.
        assert_eq!(engine.key_type(&key("text")), KeyType::Scalar);
        assert_eq!(engine.key_type(&key("number")), KeyType::Scalar);
        assert_eq!(engine.key_type(&key("missing")), KeyType::Absent);
    }

    #[test]
    fn test_keys_matching_prefix() {
        let engine = engine();

        engine.set(key("prefix-1-abc"), Bytes::from("a"), None);
        engine.set(key("prefix-2-def"), Bytes::from("b"), None);
        engine.set(key("unrelated"), Bytes::from("c"), None);

        let mut keys = engine.keys_matching(b"prefix*").unwrap();
        keys.sort();
        assert_eq!(keys, vec![key("prefix-1-abc"), key("prefix-2-def")]);

        engine.delete(&key("prefix-2-def"));
        let keys = engine.keys_matching(b"prefix*").unwrap();
        assert_eq!(keys, vec![key("prefix-1-abc")]);
    }

    #[test]
    fn test_keys_matching_invalid_pattern() {
        let engine = engine();

        let err = engine.keys_matching(b"broken[").unwrap_err();
        assert_eq!(
            err,
            CommandError::InvalidPattern(PatternError::UnclosedClass)
        );
    }

    #[test]
    fn test_flush_all() {
        let engine = engine();

        engine.set(key("a"), Bytes::from("1"), None);
        engine.set(key("b"), Bytes::from("2"), Some(Duration::from_secs(60)));

        engine.flush_all();

        assert!(engine.keys_matching(b"*").unwrap().is_empty());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_persist() {
        let engine = engine();

        engine.set(key("k"), Bytes::from("v"), Some(Duration::from_millis(40)));
        assert!(engine.persist(&key("k")));

        thread::sleep(Duration::from_millis(60));
        assert_eq!(engine.get(&key("k")), Some(Bytes::from("v")));
    }

    #[test]
    fn test_ping() {
        let engine = engine();
        assert_eq!(engine.ping(), "PONG");

        // Independent of store state.
        engine.flush_all();
        assert_eq!(engine.ping(), "PONG");
    }

    #[test]
    fn test_hundred_concurrent_writers_then_readers() {
        let engine = engine();

        let writers: Vec<_> = (0..100)
            .map(|i| {
                let engine = engine.clone();
                thread::spawn(move || {
                    engine.set(
                        Bytes::from(format!("key-{}", i)),
                        Bytes::from(format!("value-{}", i)),
                        None,
                    );
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let readers: Vec<_> = (0..100)
            .map(|i| {
                let engine = engine.clone();
                thread::spawn(move || {
                    let got = engine.get(&Bytes::from(format!("key-{}", i)));
                    assert_eq!(got, Some(Bytes::from(format!("value-{}", i))));
                })
            })
            .collect();
        for r in readers {
            r.join().unwrap();
        }

        assert_eq!(engine.len(), 100);
    }
}

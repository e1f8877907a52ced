//! Sharded Entry Store with TTL Support
//!
//! This module implements the heart of emberkv: a thread-safe map from byte
//! keys to byte values where every entry may carry an expiration deadline.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, keys are spread over many
//!    shards so operations on distinct keys rarely contend.
//! 2. **Lazy Expiry**: Every read path re-checks liveness against the clock
//!    before returning, so an expired entry is observationally absent even
//!    if its physical record has not been reclaimed yet.
//! 3. **Passive Deadlines**: Expiration is a stored `Instant` compared on
//!    access, never a timer per key.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-key operations take the owning shard's write lock, which makes them
//! linearizable with respect to each other. The two whole-store operations,
//! `flush_all` and `keys_matching`, walk shards in index order; `rename` may
//! span two shards and locks them in index order to stay deadlock-free.

use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::store::pattern::Pattern;

/// Number of shards in the store.
/// More shards = less lock contention, but more memory overhead.
const NUM_SHARDS: usize = 64;

/// A stored value together with its optional expiration deadline.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored bytes. The store is type-agnostic: callers decide whether
    /// these represent text, a number, or an opaque blob.
    pub value: Bytes,
    /// Absolute deadline after which the entry behaves as absent
    /// (None = never expires).
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry without a deadline.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry whose deadline is `ttl` from `now`.
    ///
    /// A `ttl` too large to land on a representable instant yields an entry
    /// with no deadline.
    pub fn with_ttl(value: Bytes, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    /// True iff the entry is reachable through normal lookup at `now`.
    #[inline]
    pub fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => deadline > now,
            None => true,
        }
    }

    /// Remaining time before the deadline, or None if there is no deadline.
    /// Callers must have already established liveness.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

/// One shard: an independently locked portion of the key space.
#[derive(Debug)]
struct Shard {
    entries: RwLock<HashMap<Bytes, Entry>>,
}

impl Shard {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

/// Operation counters, updated with relaxed atomics.
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Number of physically present entries (live or awaiting reclamation).
    pub keys: u64,
    /// Total get operations served.
    pub get_ops: u64,
    /// Total set operations served.
    pub set_ops: u64,
    /// Total delete operations served.
    pub del_ops: u64,
    /// Expired entries reclaimed so far (lazily or by the sweeper).
    pub expired: u64,
}

/// The in-memory entry store.
///
/// The store is the sole owner of entry state. It is designed to be wrapped
/// in an `Arc` and shared across however many concurrent callers the hosting
/// process has; every operation is safe to invoke in parallel.
///
/// # Example
///
/// ```
/// use emberkv::store::Store;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let store = Store::new();
///
/// store.set(Bytes::from("name"), Bytes::from("ember"));
/// assert_eq!(store.get(&Bytes::from("name")), Some(Bytes::from("ember")));
///
/// // With a deadline:
/// store.set_with_ttl(
///     Bytes::from("session"),
///     Bytes::from("abc123"),
///     Duration::from_millis(250),
/// );
/// ```
pub struct Store {
    /// Sharded entry maps.
    shards: Vec<Shard>,

    /// Monotonic time source for deadline arithmetic.
    clock: Clock,

    /// Physical entry count (approximate, relaxed ordering).
    key_count: AtomicU64,

    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("shards", &self.shards.len())
            .field("keys", &self.key_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::new()).collect();

        Self {
            shards,
            clock: Clock::new(),
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Determines which shard owns a key.
    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn shard_for(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Inserts or overwrites an entry with no deadline.
    ///
    /// Overwriting clears any deadline the previous entry carried.
    /// Returns `true` if a new key was created.
    pub fn set(&self, key: Bytes, value: Bytes) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.shard_for(&key);
        let mut entries = shard.entries.write().unwrap();

        let is_new = entries.insert(key, Entry::new(value)).is_none();
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
        is_new
    }

    /// Inserts or overwrites an entry that expires `ttl` from now.
    ///
    /// Returns `true` if a new key was created.
    pub fn set_with_ttl(&self, key: Bytes, value: Bytes, ttl: Duration) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now();
        let shard = self.shard_for(&key);
        let mut entries = shard.entries.write().unwrap();

        let is_new = entries.insert(key, Entry::with_ttl(value, now, ttl)).is_none();
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
        is_new
    }

    /// Returns the value for a key, or `None` if absent or expired.
    ///
    /// Expired entries found on the way are reclaimed (lazy expiry).
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now();
        let shard = self.shard_for(key);

        // Fast path: read lock for present, live keys.
        {
            let entries = shard.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // The entry looked expired: take the write lock and reclaim it.
        let mut entries = shard.entries.write().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                // Another writer replaced the key between the locks.
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.note_reclaimed(1);
                None
            }
            None => None,
        }
    }

    /// Atomically replaces a key's value and returns the prior live value.
    ///
    /// The new entry carries no deadline; any deadline on the old entry is
    /// discarded along with it. No other operation can observe a state
    /// between the read and the write.
    pub fn get_and_set(&self, key: Bytes, value: Bytes) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now();
        let shard = self.shard_for(&key);
        let mut entries = shard.entries.write().unwrap();

        match entries.insert(key, Entry::new(value)) {
            Some(old) if old.is_live(now) => Some(old.value),
            Some(_) => None,
            None => {
                self.key_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Atomically removes a key and returns its live value, if any.
    ///
    /// The physical record is removed even when it had already expired.
    pub fn get_and_delete(&self, key: &Bytes) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now();
        let shard = self.shard_for(key);
        let mut entries = shard.entries.write().unwrap();

        match entries.remove(key) {
            Some(old) => {
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                if old.is_live(now) {
                    Some(old.value)
                } else {
                    self.expired_count.fetch_add(1, Ordering::Relaxed);
                    None
                }
            }
            None => None,
        }
    }

    /// True iff a live entry is present for the key.
    pub fn exists(&self, key: &Bytes) -> bool {
        let now = self.clock.now();
        let shard = self.shard_for(key);
        let entries = shard.entries.read().unwrap();

        entries.get(key).map(|e| e.is_live(now)).unwrap_or(false)
    }

    /// Removes a key, live or not.
    ///
    /// Returns `true` if a physical record was removed.
    pub fn delete(&self, key: &Bytes) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.shard_for(key);
        let mut entries = shard.entries.write().unwrap();

        if entries.remove(key).is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Atomically moves the entry at `old_key` (value and remaining deadline)
    /// to `new_key`, overwriting `new_key` unconditionally.
    ///
    /// Returns `false` when `old_key` has no live entry; the store is left
    /// unchanged in that case except that an expired source record is
    /// reclaimed.
    ///
    /// When the two keys hash to different shards both shard locks are held
    /// for the duration of the move, in index order, so no concurrent
    /// operation can observe the value at neither or both keys.
    pub fn rename(&self, old_key: &Bytes, new_key: Bytes) -> bool {
        let now = self.clock.now();
        let src = self.shard_index(old_key);
        let dst = self.shard_index(&new_key);

        if src == dst {
            let mut entries = self.shards[src].entries.write().unwrap();
            return self.move_within(&mut entries, old_key, new_key, now);
        }

        // Lock both shards in index order to avoid deadlock with a
        // concurrent rename going the other way.
        let (lo, hi) = if src < dst { (src, dst) } else { (dst, src) };
        let mut lo_guard = self.shards[lo].entries.write().unwrap();
        let mut hi_guard = self.shards[hi].entries.write().unwrap();
        let (src_map, dst_map) = if src < dst {
            (&mut *lo_guard, &mut *hi_guard)
        } else {
            (&mut *hi_guard, &mut *lo_guard)
        };

        match src_map.remove(old_key) {
            Some(entry) if entry.is_live(now) => {
                if dst_map.insert(new_key, entry).is_some() {
                    // Source slot freed, destination slot reused.
                    self.key_count.fetch_sub(1, Ordering::Relaxed);
                }
                true
            }
            Some(_) => {
                self.note_reclaimed(1);
                false
            }
            None => false,
        }
    }

    /// Single-shard variant of the rename move, running under one lock.
    fn move_within(
        &self,
        entries: &mut HashMap<Bytes, Entry>,
        old_key: &Bytes,
        new_key: Bytes,
        now: Instant,
    ) -> bool {
        match entries.remove(old_key) {
            Some(entry) if entry.is_live(now) => {
                if entries.insert(new_key, entry).is_some() {
                    self.key_count.fetch_sub(1, Ordering::Relaxed);
                }
                true
            }
            Some(_) => {
                self.note_reclaimed(1);
                false
            }
            None => false,
        }
    }

    /// Sets the deadline of an existing live entry to `ttl` from now.
    /// A `ttl` too large to land on a representable instant clears the
    /// deadline instead.
    ///
    /// Returns `false` if the key is absent or already expired (an expired
    /// record is reclaimed on the way out).
    pub fn expire_after(&self, key: &Bytes, ttl: Duration) -> bool {
        let now = self.clock.now();
        let shard = self.shard_for(key);
        let mut entries = shard.entries.write().unwrap();

        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = now.checked_add(ttl);
                true
            }
            Some(_) => {
                entries.remove(key);
                self.note_reclaimed(1);
                false
            }
            None => false,
        }
    }

    /// Clears the deadline of a live entry, making it persistent.
    ///
    /// Returns `true` only when a deadline was actually removed.
    pub fn persist(&self, key: &Bytes) -> bool {
        let now = self.clock.now();
        let shard = self.shard_for(key);
        let mut entries = shard.entries.write().unwrap();

        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                if entry.expires_at.is_some() {
                    entry.expires_at = None;
                    true
                } else {
                    false
                }
            }
            Some(_) => {
                entries.remove(key);
                self.note_reclaimed(1);
                false
            }
            None => false,
        }
    }

    /// Remaining time to live for a key.
    ///
    /// - `None` - no live entry
    /// - `Some(None)` - live entry without a deadline
    /// - `Some(Some(d))` - live entry expiring in `d`
    pub fn ttl(&self, key: &Bytes) -> Option<Option<Duration>> {
        let now = self.clock.now();
        let shard = self.shard_for(key);
        let entries = shard.entries.read().unwrap();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.remaining(now)),
            _ => None,
        }
    }

    /// Returns all live keys matching a compiled pattern.
    ///
    /// Liveness is judged against a single instant taken when the scan
    /// starts, and each shard is copied out under its read lock, so the
    /// result is a consistent per-shard snapshot: keys settled before the
    /// scan are deterministically in or out, keys mutated mid-scan may go
    /// either way, and a reclaimed entry can never appear.
    pub fn keys_matching(&self, pattern: &Pattern) -> Vec<Bytes> {
        let now = self.clock.now();
        let mut result = Vec::new();

        for shard in &self.shards {
            let entries = shard.entries.read().unwrap();
            for (key, entry) in entries.iter() {
                if entry.is_live(now) && pattern.matches(key) {
                    result.push(key.clone());
                }
            }
        }

        result
    }

    /// Atomically discards every entry, live or not.
    ///
    /// All shard locks are held at once, so no concurrent reader can observe
    /// a half-flushed store.
    pub fn flush_all(&self) {
        let mut guards: Vec<_> = self
            .shards
            .iter()
            .map(|shard| shard.entries.write().unwrap())
            .collect();

        for guard in &mut guards {
            guard.clear();
        }
        self.key_count.store(0, Ordering::Relaxed);
    }

    /// Approximate number of physical entries (relaxed counter).
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// True if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Number of shards, for callers that sweep incrementally.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Reclaims every expired entry in one shard; `index` is taken modulo
    /// the shard count.
    ///
    /// Counter updates happen while the shard's write lock is still held, so
    /// a concurrent `flush_all` (which resets the count under all locks)
    /// cannot interleave between the removal and its bookkeeping.
    ///
    /// Returns `(entries examined, entries reclaimed)`.
    pub fn reclaim_shard(&self, index: usize) -> (u64, u64) {
        let now = self.clock.now();
        let shard = &self.shards[index % self.shards.len()];
        let mut entries = shard.entries.write().unwrap();

        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let reclaimed = (before - entries.len()) as u64;
        if reclaimed > 0 {
            self.note_reclaimed(reclaimed);
        }

        (before as u64, reclaimed)
    }

    /// Reclaims every expired entry in every shard.
    ///
    /// Called for full sweeps; lazy expiry makes this purely a memory-hygiene
    /// pass, never a correctness requirement.
    ///
    /// Returns the number of entries reclaimed.
    pub fn reclaim_expired(&self) -> u64 {
        (0..self.shards.len()).map(|i| self.reclaim_shard(i).1).sum()
    }

    /// Bookkeeping for a lazily reclaimed entry.
    #[inline]
    fn note_reclaimed(&self, n: u64) {
        self.key_count.fetch_sub(n, Ordering::Relaxed);
        self.expired_count.fetch_add(n, Ordering::Relaxed);
    }
}

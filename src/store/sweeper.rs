//! Background Expiry Sweeper
//!
//! Lazy expiry keeps expired entries invisible, but an entry that is never
//! touched again would otherwise sit in memory until a flush. The sweeper is
//! the eager half of reclamation: a tokio task that periodically calls
//! [`Store::reclaim_expired`] and frees those orphans.
//!
//! Correctness never depends on it. Every read path re-checks liveness, so
//! the sweeper can run at any cadence (or not at all) without changing the
//! outcome of any operation.
//!
//! ## Adaptive Cadence
//!
//! Each tick sweeps a rotating band of shards rather than the whole store,
//! so a single tick's lock footprint stays small even on a large key space.
//! The interval between ticks adapts to the expiry rate observed in the
//! swept band: when a large fraction of its entries is dying the sweeper
//! speeds up, and when almost nothing expires it backs off to save CPU.

use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the sweeper.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Starting interval between sweeps.
    pub base_interval: Duration,

    /// Floor the interval can shrink to under heavy expiry.
    pub min_interval: Duration,

    /// Ceiling the interval can grow to when the store is quiet.
    pub max_interval: Duration,

    /// Speed up when more than this fraction of entries expired last sweep.
    pub speedup_threshold: f64,

    /// Slow down when less than this fraction expired last sweep.
    pub slowdown_threshold: f64,

    /// Shards examined per tick. The sweeper rotates through the store, so
    /// a full pass takes `shard_count / shards_per_sweep` ticks.
    pub shards_per_sweep: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
            shards_per_sweep: 16,
        }
    }
}

/// Handle to a running sweeper task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl Sweeper {
    /// Spawns the sweeper onto the current tokio runtime.
    pub fn start(store: Arc<Store>, config: SweepConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweep_loop(store, config, shutdown_rx));

        info!("expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Signals the sweeper task to stop.
    ///
    /// Called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("expiry sweeper stopped");
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep_loop(store: Arc<Store>, config: SweepConfig, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = config.base_interval;
    let mut cursor = 0usize;
    let band = config.shards_per_sweep.clamp(1, store.shard_count());

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("sweeper received shutdown signal");
                    return;
                }
            }
        }

        let mut scanned = 0u64;
        let mut reclaimed = 0u64;
        for _ in 0..band {
            let (shard_scanned, shard_reclaimed) = store.reclaim_shard(cursor);
            scanned += shard_scanned;
            reclaimed += shard_reclaimed;
            cursor = (cursor + 1) % store.shard_count();
        }

        if scanned > 0 {
            let expiry_rate = reclaimed as f64 / scanned as f64;

            if expiry_rate > config.speedup_threshold {
                interval = (interval / 2).max(config.min_interval);
                debug!(
                    reclaimed,
                    rate = %format!("{:.2}%", expiry_rate * 100.0),
                    interval_ms = interval.as_millis(),
                    "high expiry rate, sweeping faster"
                );
            } else if expiry_rate < config.slowdown_threshold && reclaimed == 0 {
                interval = (interval * 2).min(config.max_interval);
                trace!(interval_ms = interval.as_millis(), "quiet band, backing off");
            }
        }

        if reclaimed > 0 {
            debug!(reclaimed, remaining = store.len(), "expired entries reclaimed");
        }
    }
}

/// Starts a sweeper with the default configuration.
pub fn start_sweeper(store: Arc<Store>) -> Sweeper {
    Sweeper::start(store, SweepConfig::default())
}

// Capture metrics module
//
// Lightweight counters for what happened during a capture run

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Session-wide capture metrics
///
/// Uses atomic operations for thread-safe tracking without locks.
/// Counters are collected throughout the application lifecycle and logged
/// on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Captures written to a session folder
    pub captures_saved: AtomicU64,

    /// Existing captures moved to `archive/` before being replaced
    pub captures_archived: AtomicU64,

    /// Archive moves that failed and blocked a write
    pub archive_failures: AtomicU64,

    /// Captures that needed a collision suffix
    pub collision_suffixes: AtomicU64,

    pub sessions_created: AtomicU64,
    pub sessions_renamed: AtomicU64,
    pub sessions_deleted: AtomicU64,

    /// Number of state updates performed
    pub state_updates: AtomicU64,

    /// Number of state broadcasts sent
    pub state_broadcasts: AtomicU64,

    /// Broadcasts with no live subscriber
    pub state_broadcast_errors: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            captures_saved: AtomicU64::new(0),
            captures_archived: AtomicU64::new(0),
            archive_failures: AtomicU64::new(0),
            collision_suffixes: AtomicU64::new(0),
            sessions_created: AtomicU64::new(0),
            sessions_renamed: AtomicU64::new(0),
            sessions_deleted: AtomicU64::new(0),
            state_updates: AtomicU64::new(0),
            state_broadcasts: AtomicU64::new(0),
            state_broadcast_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_capture_saved(&self) {
        self.captures_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_archived(&self) {
        self.captures_archived.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_archive_failure(&self) {
        self.archive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_collision_suffix(&self) {
        self.collision_suffixes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_renamed(&self) {
        self.sessions_renamed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_deleted(&self) {
        self.sessions_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state update
    pub fn record_state_update(&self) {
        self.state_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state broadcast
    pub fn record_state_broadcast(&self) {
        self.state_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state broadcast error
    pub fn record_state_broadcast_error(&self) {
        self.state_broadcast_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Capture Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Captures: {} saved, {} archived, {} archive failures, {} collision suffixes",
            self.captures_saved.load(Ordering::Relaxed),
            self.captures_archived.load(Ordering::Relaxed),
            self.archive_failures.load(Ordering::Relaxed),
            self.collision_suffixes.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Sessions: {} created, {} renamed, {} deleted",
            self.sessions_created.load(Ordering::Relaxed),
            self.sessions_renamed.load(Ordering::Relaxed),
            self.sessions_deleted.load(Ordering::Relaxed)
        );
        tracing::info!(
            "State updates: {}, broadcasts: {}, errors: {}",
            self.state_updates.load(Ordering::Relaxed),
            self.state_broadcasts.load(Ordering::Relaxed),
            self.state_broadcast_errors.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

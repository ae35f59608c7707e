// src/core/state/stats.rs

//! Contains state definitions and logic for connection-core statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters surfaced by INFO.
#[derive(Debug, Default)]
pub struct StatsState {
    /// Root contexts created for client connections.
    total_contexts: AtomicU64,
    /// Child contexts forked for squashed execution.
    total_squashed_contexts: AtomicU64,
    /// Subscribe and unsubscribe batches applied to the routing index.
    total_subscription_changes: AtomicU64,
}

impl StatsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_total_contexts(&self) {
        self.total_contexts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_contexts(&self) -> u64 {
        self.total_contexts.load(Ordering::Relaxed)
    }

    pub fn increment_total_squashed_contexts(&self) {
        self.total_squashed_contexts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_squashed_contexts(&self) -> u64 {
        self.total_squashed_contexts.load(Ordering::Relaxed)
    }

    pub fn increment_total_subscription_changes(&self) {
        self.total_subscription_changes
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_subscription_changes(&self) -> u64 {
        self.total_subscription_changes.load(Ordering::Relaxed)
    }
}

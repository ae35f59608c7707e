// src/core/metrics.rs

//! Defines and registers Prometheus metrics for the connection core.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, TextEncoder, register_counter, register_gauge};

lazy_static! {
    // --- Gauges ---
    /// The number of connection contexts holding at least one channel or pattern subscription.
    pub static ref SUBSCRIBED_CONTEXTS: Gauge =
        register_gauge!("spinelshard_subscribed_contexts", "Number of contexts with an active subscription.").unwrap();
    /// The number of connections registered as monitors across all shards.
    pub static ref MONITOR_CONNECTIONS: Gauge =
        register_gauge!("spinelshard_monitor_connections", "Number of connections in MONITOR mode.").unwrap();
    /// The number of Lua interpreters currently lent out to connections.
    pub static ref INTERPRETERS_BORROWED: Gauge =
        register_gauge!("spinelshard_interpreters_borrowed", "Number of Lua interpreters borrowed from shard pools.").unwrap();

    // --- Counters ---
    /// The number of snapshot swaps applied to the channel routing index.
    pub static ref CHANNEL_STORE_SWAPS_TOTAL: Counter =
        register_counter!("spinelshard_channel_store_swaps_total", "Total number of routing index snapshot swaps.").unwrap();
    /// The number of broadcast-and-wait rounds issued to the shard set.
    pub static ref SHARD_BROADCASTS_TOTAL: Counter =
        register_counter!("spinelshard_shard_broadcasts_total", "Total number of shard broadcasts.").unwrap();
    /// The number of messages handed to subscriber queues by PUBLISH.
    pub static ref PUBSUB_MESSAGES_DELIVERED_TOTAL: Counter =
        register_counter!("spinelshard_pubsub_messages_delivered_total", "Total number of pub/sub messages delivered to subscribers.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

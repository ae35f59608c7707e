// src/core/pubsub/channel_store.rs

//! The process-wide routing index from channels and patterns to subscribers.
//!
//! Publishers read an immutable snapshot without taking any lock. Writers build a new
//! snapshot from the current one under `update_lock` and publish it with a single swap,
//! so a batch of subscription changes becomes visible all at once. Per-channel subscriber
//! maps are shared between snapshots and only copied when a batch touches them.

use super::glob::glob_match;
use crate::connection::{Connection, PushMessage};
use crate::core::metrics::{CHANNEL_STORE_SWAPS_TOTAL, PUBSUB_MESSAGES_DELIVERED_TOTAL};
use arc_swap::ArcSwap;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A registration in the routing index.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Id of the `ConnectionContext` that subscribed.
    pub context_id: u64,
    /// Shard thread that owns the subscribing context.
    pub thread_id: u32,
    pub conn: Option<Arc<Connection>>,
}

type SubscriberMap = Arc<HashMap<u64, Subscriber>>;

#[derive(Debug, Default, Clone)]
pub struct ChannelMap {
    channels: HashMap<Bytes, SubscriberMap>,
    patterns: HashMap<Bytes, SubscriberMap>,
}

impl ChannelMap {
    fn table_mut(&mut self, pattern: bool) -> &mut HashMap<Bytes, SubscriberMap> {
        if pattern {
            &mut self.patterns
        } else {
            &mut self.channels
        }
    }
}

#[derive(Debug)]
pub struct ChannelStore {
    snapshot: ArcSwap<ChannelMap>,
    update_lock: Mutex<()>,
    outbound_queue_warn_len: usize,
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl ChannelStore {
    pub fn new(outbound_queue_warn_len: usize) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(ChannelMap::default()),
            update_lock: Mutex::new(()),
            outbound_queue_warn_len,
        }
    }

    /// Delivers `payload` to every subscriber of `channel` and of every pattern matching it.
    /// Returns the number of deliveries.
    pub fn publish(&self, channel: &[u8], payload: &Bytes) -> usize {
        let snapshot = self.snapshot.load();
        let channel = Bytes::copy_from_slice(channel);
        let mut delivered = 0;

        if let Some(subs) = snapshot.channels.get(&channel) {
            for sub in subs.values() {
                let msg = PushMessage::Message {
                    channel: channel.clone(),
                    payload: payload.clone(),
                };
                if self.deliver(sub, msg) {
                    delivered += 1;
                }
            }
        }

        for (pattern, subs) in snapshot.patterns.iter() {
            if !glob_match(pattern, &channel) {
                continue;
            }
            for sub in subs.values() {
                let msg = PushMessage::PMessage {
                    pattern: pattern.clone(),
                    channel: channel.clone(),
                    payload: payload.clone(),
                };
                if self.deliver(sub, msg) {
                    delivered += 1;
                }
            }
        }

        PUBSUB_MESSAGES_DELIVERED_TOTAL.inc_by(delivered as f64);
        delivered
    }

    fn deliver(&self, sub: &Subscriber, msg: PushMessage) -> bool {
        let Some(conn) = &sub.conn else {
            return false;
        };
        if !conn.push(msg) {
            return false;
        }
        let queued = conn.queued_len();
        if queued > self.outbound_queue_warn_len {
            warn!(
                "Subscriber {} (client {}) has {} undelivered messages",
                sub.context_id,
                conn.id(),
                queued
            );
        }
        true
    }

    /// Active channels with at least one subscriber, optionally filtered by a glob.
    pub fn channels(&self, pattern: Option<&[u8]>) -> Vec<Bytes> {
        self.snapshot
            .load()
            .channels
            .keys()
            .filter(|name| pattern.is_none_or(|p| glob_match(p, name)))
            .cloned()
            .collect()
    }

    pub fn num_subscribers(&self, channel: &[u8]) -> usize {
        self.snapshot
            .load()
            .channels
            .get(channel)
            .map_or(0, |subs| subs.len())
    }

    /// Number of distinct patterns with at least one subscriber.
    pub fn pattern_count(&self) -> usize {
        self.snapshot.load().patterns.len()
    }

    /// Subscribers registered for exactly `channel`.
    pub fn subscribers(&self, channel: &[u8]) -> Vec<Subscriber> {
        self.snapshot
            .load()
            .channels
            .get(channel)
            .map(|subs| subs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Subscribers registered for exactly the pattern string `pattern`.
    pub fn pattern_subscribers(&self, pattern: &[u8]) -> Vec<Subscriber> {
        self.snapshot
            .load()
            .patterns
            .get(pattern)
            .map(|subs| subs.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// Collects subscription changes for one subscriber and applies them as one swap.
pub struct ChannelStoreUpdater<'s> {
    store: &'s ChannelStore,
    pattern: bool,
    to_add: bool,
    subscriber: Subscriber,
    names: Vec<Bytes>,
}

impl<'s> ChannelStoreUpdater<'s> {
    pub fn new(store: &'s ChannelStore, pattern: bool, to_add: bool, subscriber: Subscriber) -> Self {
        Self {
            store,
            pattern,
            to_add,
            subscriber,
            names: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &[u8]) {
        self.names.push(Bytes::copy_from_slice(name));
    }

    /// Publishes every recorded change in a single snapshot swap.
    pub fn apply(self) {
        if self.names.is_empty() {
            return;
        }

        let _guard = self.store.update_lock.lock();
        let mut next = ChannelMap::clone(&self.store.snapshot.load());
        let table = next.table_mut(self.pattern);
        let id = self.subscriber.context_id;

        for name in &self.names {
            if self.to_add {
                let subs = table.entry(name.clone()).or_default();
                Arc::make_mut(subs).insert(id, self.subscriber.clone());
                continue;
            }
            let now_empty = match table.get_mut(name) {
                Some(subs) => {
                    Arc::make_mut(subs).remove(&id);
                    subs.is_empty()
                }
                None => false,
            };
            if now_empty {
                table.remove(name);
            }
        }

        self.store.snapshot.store(Arc::new(next));
        CHANNEL_STORE_SWAPS_TOTAL.inc();
        debug!(
            "Applied {} {} {} for context {}",
            self.names.len(),
            if self.pattern { "pattern" } else { "channel" },
            if self.to_add { "additions" } else { "removals" },
            id
        );
    }
}

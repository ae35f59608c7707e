// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::stats::StatsState;
use crate::config::Config;
use crate::core::SpinelError;
use crate::core::namespace::{DEFAULT_NAMESPACE, Namespace};
use crate::core::pubsub::ChannelStore;
use crate::core::shard::ShardSet;
use std::sync::Arc;
use tracing::info;

/// The struct holding all shared, server-wide state.
/// It is wrapped in an `Arc` and handed to every connection context.
#[derive(Debug)]
pub struct ServerState {
    pub config: Arc<Config>,
    /// The shard threads and the broadcast facility over them.
    pub shard_set: ShardSet,
    /// The routing index for channels and patterns.
    pub channel_store: ChannelStore,
    /// The namespace connections land in until they select another one.
    pub default_namespace: Arc<Namespace>,
    pub stats: StatsState,
}

impl ServerState {
    /// Starts the shard threads and builds the shared state from the given configuration.
    pub fn initialize(config: Config) -> Result<Arc<Self>, SpinelError> {
        let shard_count = config.shard_count();
        let shard_set = ShardSet::new(shard_count, config.scripting.interpreters_per_shard)?;
        let channel_store = ChannelStore::new(config.pubsub.outbound_queue_warn_len);

        info!(
            "Server state initialized with {} shards",
            shard_set.size()
        );

        Ok(Arc::new(Self {
            config: Arc::new(config),
            shard_set,
            channel_store,
            default_namespace: Namespace::new(DEFAULT_NAMESPACE),
            stats: StatsState::new(),
        }))
    }

    /// Stops the shard threads.
    pub fn shutdown(&self) {
        info!("Stopping {} shards", self.shard_set.size());
        self.shard_set.shutdown();
    }
}

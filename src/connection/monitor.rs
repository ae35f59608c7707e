// src/connection/monitor.rs

//! MONITOR registration and the feed of executed commands to monitoring clients.

use super::context::ConnectionContext;
use crate::core::SpinelError;
use crate::core::shard::{ShardLocal, format_monitor_line};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;
use tracing::{debug, warn};

impl ConnectionContext<'_> {
    /// Starts or stops monitoring for this context's connection.
    ///
    /// The connection is registered with the shard it runs on, then every shard updates
    /// its count of monitors process-wide. Returns once all shards have done so.
    pub async fn change_monitor(&mut self, start: bool) -> Result<(), SpinelError> {
        let conn = self
            .conn()
            .cloned()
            .ok_or_else(|| SpinelError::InvalidState("MONITOR requires a client connection".into()))?;

        let registered_here = ShardLocal::with(|local| {
            if start {
                local.monitors.add(Arc::clone(&conn));
                true
            } else {
                local.monitors.remove(conn.id())
            }
        })
        .ok_or(SpinelError::NotOnShardThread)?;

        if !start {
            debug!("connection {} no longer needs to be monitored", conn.id());
        }

        let broadcast = self
            .state
            .shard_set
            .await_brief(move |_| {
                ShardLocal::with(|local| local.monitors.notify_change_count(start));
            })
            .await;

        if let Err(e) = broadcast {
            // Keep the local registry in line with `self.monitor`, which stays unchanged.
            ShardLocal::with(|local| {
                if start {
                    local.monitors.remove(conn.id());
                } else if registered_here {
                    local.monitors.add(Arc::clone(&conn));
                }
            });
            warn!(
                "MONITOR {} for connection {} failed: {}",
                if start { "start" } else { "stop" },
                conn.id(),
                e
            );
            return Err(e);
        }

        self.monitor = start;
        Ok(())
    }

    /// Sends a command about to be executed to every monitor on every shard.
    /// Returns the number of monitors that received it.
    pub async fn dispatch_monitor(&self, args: &[&[u8]]) -> Result<usize, SpinelError> {
        let any = ShardLocal::with(|local| local.monitors.has_any()).unwrap_or(false);
        if !any {
            return Ok(0);
        }

        let client = self
            .conn()
            .and_then(|conn| conn.addr())
            .map_or_else(|| "lua".to_string(), |addr| addr.to_string());
        let line = format_monitor_line(SystemTime::now(), self.conn_state.db_index, &client, args);

        let fed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fed);
        self.state
            .shard_set
            .await_brief(move |_| {
                let n = ShardLocal::with(|local| local.monitors.feed(&line)).unwrap_or(0);
                counter.fetch_add(n, Ordering::Relaxed);
            })
            .await?;
        Ok(fed.load(Ordering::Relaxed))
    }
}

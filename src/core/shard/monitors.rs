// src/core/shard/monitors.rs

//! Per-shard registry of connections in MONITOR mode.
//!
//! Each shard only holds the monitors that live on it, but also tracks how many exist
//! across the whole process so that the command path can skip formatting a monitor line
//! when nobody is listening.

use crate::connection::{Connection, PushMessage};
use crate::core::DbIndex;
use crate::core::metrics::MONITOR_CONNECTIONS;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default)]
pub struct MonitorsRepo {
    monitors: Vec<Arc<Connection>>,
    global_count: usize,
}

impl MonitorsRepo {
    pub fn add(&mut self, conn: Arc<Connection>) {
        MONITOR_CONNECTIONS.inc();
        self.monitors.push(conn);
    }

    /// Removes the monitor with the given client id. Returns false for unknown ids.
    pub fn remove(&mut self, conn_id: u64) -> bool {
        let Some(pos) = self.monitors.iter().position(|c| c.id() == conn_id) else {
            return false;
        };
        self.monitors.swap_remove(pos);
        MONITOR_CONNECTIONS.dec();
        true
    }

    /// Adjusts the process-wide monitor count after a connection started or stopped monitoring.
    pub fn notify_change_count(&mut self, added: bool) {
        if added {
            self.global_count += 1;
        } else {
            debug_assert!(self.global_count > 0, "monitor count underflow");
            self.global_count = self.global_count.saturating_sub(1);
        }
    }

    pub fn global_count(&self) -> usize {
        self.global_count
    }

    /// Monitors registered on this shard.
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// True if any connection in the process is monitoring.
    pub fn has_any(&self) -> bool {
        self.global_count > 0
    }

    /// Sends `line` to every local monitor. Returns how many received it.
    pub fn feed(&self, line: &Bytes) -> usize {
        self.monitors
            .iter()
            .filter(|conn| conn.push(PushMessage::Monitor(line.clone())))
            .count()
    }
}

/// Renders a command the way MONITOR prints it:
/// `1700000000.123456 [0 127.0.0.1:6379] "SET" "key" "value"`.
pub fn format_monitor_line(now: SystemTime, db: DbIndex, client: &str, args: &[&[u8]]) -> Bytes {
    let ts = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let mut line = BytesMut::new();
    line.put_slice(format!("{}.{:06} [{} {}]", ts.as_secs(), ts.subsec_micros(), db, client).as_bytes());
    for arg in args {
        line.put_slice(b" \"");
        for &b in arg.iter() {
            match b {
                b'"' => line.put_slice(b"\\\""),
                b'\\' => line.put_slice(b"\\\\"),
                b'\n' => line.put_slice(b"\\n"),
                b'\r' => line.put_slice(b"\\r"),
                b'\t' => line.put_slice(b"\\t"),
                0x20..=0x7e => line.put_u8(b),
                _ => line.put_slice(format!("\\x{b:02x}").as_bytes()),
            }
        }
        line.put_u8(b'"');
    }
    line.freeze()
}

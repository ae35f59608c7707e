// src/core/shard/mod.rs

//! The shard runtime: one OS thread per shard, each driving a cooperative event loop,
//! plus the state that lives on each of those threads.

pub mod local;
pub mod monitors;
pub mod shard_set;

pub use local::{ShardLocal, current_index};
pub use monitors::{MonitorsRepo, format_monitor_line};
pub use shard_set::ShardSet;

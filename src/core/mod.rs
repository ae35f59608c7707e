// src/core/mod.rs

//! The shard-side building blocks used by every client connection: command capture,
//! the shard runtime, the channel routing index and the reply layer interface.

pub mod acl;
pub mod commands;
pub mod errors;
pub mod memory;
pub mod metrics;
pub mod namespace;
pub mod protocol;
pub mod pubsub;
pub mod scripting;
pub mod shard;
pub mod state;
pub mod transaction;

pub use commands::{CommandId, StoredCmd};
pub use errors::SpinelError;
pub use protocol::RespValue;

/// Index of a logical database within a namespace.
pub type DbIndex = u16;

// src/connection/mod.rs

//! Per-client state and the operations that act on it: construction and forking of
//! contexts, pub/sub subscriptions and MONITOR.

mod context;
mod handle;
mod monitor;
mod state;
mod subscription;

pub use context::ConnectionContext;
pub use handle::{Connection, ListenerKind, PushMessage, PushReceiver};
pub use state::{
    ClientTracking, ConnectionState, ExecInfo, ExecState, ScriptInfo, SquashingInfo,
    SubscribeInfo, TrackingOption,
};

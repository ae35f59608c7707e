// src/core/errors.rs

//! Defines the error type shared by the connection core and its collaborators.
//!
//! The connection core itself reports almost nothing as a recoverable error: broken
//! invariants are debug assertions. What remains here are failures of the surrounding
//! runtime, such as a shard thread that is no longer accepting work.

use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SpinelError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// A shard thread dropped its task queue or its completion signal.
    #[error("Shard {0} is not accepting work")]
    ShardUnavailable(u32),

    /// An operation that needs thread-local shard state was called from another thread.
    #[error("Operation must run on a shard thread")]
    NotOnShardThread,

    #[error("Command not allowed in the current state: {0}")]
    InvalidState(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl PartialEq for SpinelError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SpinelError::Io(e1), SpinelError::Io(e2)) => e1.to_string() == e2.to_string(),
            (SpinelError::ShardUnavailable(a), SpinelError::ShardUnavailable(b)) => a == b,
            (SpinelError::InvalidState(s1), SpinelError::InvalidState(s2)) => s1 == s2,
            (SpinelError::Internal(s1), SpinelError::Internal(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for SpinelError {
    fn from(e: std::io::Error) -> Self {
        SpinelError::Io(Arc::new(e))
    }
}

impl From<mlua::Error> for SpinelError {
    fn from(e: mlua::Error) -> Self {
        SpinelError::Internal(format!("Lua interpreter error: {e}"))
    }
}

// src/core/commands/mod.rs

//! Command metadata and the captured-command representation used for deferred execution.

pub mod descriptor;
pub mod stored_cmd;

pub use descriptor::{CommandFlags, CommandId, ReplyMode};
pub use stored_cmd::{
    CmdArgList, CmdArgVec, INLINE_ARG_COUNT, INLINE_BUFFER_CAPACITY, StoredCmd,
};

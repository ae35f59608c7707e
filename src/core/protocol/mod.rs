// src/core/protocol/mod.rs

pub mod reply;
pub mod resp_frame;
pub mod resp_value;

pub use reply::{BufferedReplyBuilder, CapturingReplyBuilder, ReplyBuilder, ReplyScope};
pub use resp_frame::{RespFrame, RespFrameCodec, RespVersion};
pub use resp_value::RespValue;

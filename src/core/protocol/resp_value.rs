// src/core/protocol/resp_value.rs

//! The reply values the connection core hands to a `ReplyBuilder`.

use super::RespFrame;
use bytes::Bytes;

/// A reply independent of the client's protocol version.
///
/// Nulls and pushes are encoded differently for RESP2 and RESP3 clients; the choice is
/// made when the value becomes a `RespFrame` and is written out.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    BulkString(Bytes),
    Integer(i64),
    Array(Vec<RespValue>),
    /// Pub/sub notifications and subscription acknowledgements.
    Push(Vec<RespValue>),
    Null,
}

impl From<RespValue> for RespFrame {
    fn from(val: RespValue) -> Self {
        match val {
            RespValue::SimpleString(s) => RespFrame::SimpleString(s),
            RespValue::BulkString(b) => RespFrame::BulkString(b),
            RespValue::Integer(i) => RespFrame::Integer(i),
            RespValue::Array(items) => RespFrame::Array(items.into_iter().map(Into::into).collect()),
            RespValue::Push(items) => RespFrame::Push(items.into_iter().map(Into::into).collect()),
            RespValue::Null => RespFrame::Null,
        }
    }
}

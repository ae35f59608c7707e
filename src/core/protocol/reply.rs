// src/core/protocol/reply.rs

//! The interface between command handlers and the client's output stream.
//!
//! Handlers push `RespValue`s into a `ReplyBuilder`. A `ReplyScope` groups several values
//! so that they reach the socket as a single write.

use super::{RespFrame, RespFrameCodec, RespValue, RespVersion};
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

pub trait ReplyBuilder {
    fn send_value(&mut self, value: RespValue);

    /// Starts batching. Scopes nest; only the outermost one flushes.
    fn begin_scope(&mut self);

    fn end_scope(&mut self);
}

/// Batches every value sent through it until it is dropped.
pub struct ReplyScope<'a> {
    rb: &'a mut dyn ReplyBuilder,
}

impl<'a> ReplyScope<'a> {
    pub fn new(rb: &'a mut dyn ReplyBuilder) -> Self {
        rb.begin_scope();
        Self { rb }
    }

    pub fn send_value(&mut self, value: RespValue) {
        self.rb.send_value(value);
    }
}

impl Drop for ReplyScope<'_> {
    fn drop(&mut self) {
        self.rb.end_scope();
    }
}

/// Encodes replies into RESP and collects the resulting socket writes.
#[derive(Debug, Default)]
pub struct BufferedReplyBuilder {
    codec: RespFrameCodec,
    pending: BytesMut,
    depth: usize,
    writes: Vec<Bytes>,
}

impl BufferedReplyBuilder {
    pub fn new(version: RespVersion) -> Self {
        Self {
            codec: RespFrameCodec::new(version),
            ..Default::default()
        }
    }

    pub fn version(&self) -> RespVersion {
        self.codec.version()
    }

    /// Drains the writes completed so far. Values inside an open scope are held back.
    pub fn take_writes(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.writes)
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.writes.push(self.pending.split().freeze());
        }
    }
}

impl ReplyBuilder for BufferedReplyBuilder {
    fn send_value(&mut self, value: RespValue) {
        if let Err(e) = self.codec.encode(RespFrame::from(value), &mut self.pending) {
            error!("Failed to encode reply: {}", e);
            return;
        }
        if self.depth == 0 {
            self.flush();
        }
    }

    fn begin_scope(&mut self) {
        self.depth += 1;
    }

    fn end_scope(&mut self) {
        debug_assert!(self.depth > 0, "unbalanced reply scope");
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.flush();
        }
    }
}

/// Records replies instead of encoding them.
///
/// Squashed sub-executions reply into one of these; the owner later replays the values
/// to the real client.
#[derive(Debug, Default)]
pub struct CapturingReplyBuilder {
    values: Vec<RespValue>,
    depth: usize,
    scopes_closed: usize,
}

impl CapturingReplyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[RespValue] {
        &self.values
    }

    pub fn take_values(&mut self) -> Vec<RespValue> {
        std::mem::take(&mut self.values)
    }

    /// Number of outermost scopes that have been closed.
    pub fn scopes_closed(&self) -> usize {
        self.scopes_closed
    }

    pub fn replay(&mut self, rb: &mut dyn ReplyBuilder) {
        let mut scope = ReplyScope::new(rb);
        for value in self.values.drain(..) {
            scope.send_value(value);
        }
    }
}

impl ReplyBuilder for CapturingReplyBuilder {
    fn send_value(&mut self, value: RespValue) {
        self.values.push(value);
    }

    fn begin_scope(&mut self) {
        self.depth += 1;
    }

    fn end_scope(&mut self) {
        debug_assert!(self.depth > 0, "unbalanced reply scope");
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.scopes_closed += 1;
        }
    }
}

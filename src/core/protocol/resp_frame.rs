// src/core/protocol/resp_frame.rs

//! Implements the RESP (REdis Serialization Protocol) frame structure and the
//! corresponding `Encoder` used by the reply layer.

use crate::core::SpinelError;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

/// The CRLF (Carriage Return, Line Feed) sequence used to terminate lines in RESP.
const CRLF: &[u8] = b"\r\n";

/// The protocol version negotiated by the client (`HELLO 2` / `HELLO 3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RespVersion {
    #[default]
    Resp2,
    Resp3,
}

/// An enum representing a single frame in the RESP protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    Array(Vec<RespFrame>),
    /// Out-of-band data such as pub/sub notifications. RESP2 clients see a plain array.
    Push(Vec<RespFrame>),
}

impl RespFrame {
    /// A convenience method to encode a frame into a `Vec<u8>`.
    pub fn encode_to_vec(&self, version: RespVersion) -> Result<Vec<u8>, SpinelError> {
        let mut buf = BytesMut::new();
        RespFrameCodec::new(version).encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }
}

/// A `tokio_util::codec` encoder for `RespFrame`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RespFrameCodec {
    version: RespVersion,
}

impl RespFrameCodec {
    pub fn new(version: RespVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> RespVersion {
        self.version
    }

    fn encode_aggregate(
        &mut self,
        prefix: &[u8],
        items: Vec<RespFrame>,
        dst: &mut BytesMut,
    ) -> Result<(), SpinelError> {
        dst.extend_from_slice(prefix);
        dst.extend_from_slice(items.len().to_string().as_bytes());
        dst.extend_from_slice(CRLF);
        for frame in items {
            // Recursively encode each nested frame.
            self.encode(frame, dst)?;
        }
        Ok(())
    }
}

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = SpinelError;

    /// Encodes a `RespFrame` into a `BytesMut` buffer according to the negotiated version.
    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            RespFrame::SimpleString(s) => {
                dst.extend_from_slice(b"+");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Integer(i) => {
                dst.extend_from_slice(b":");
                dst.extend_from_slice(i.to_string().as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::BulkString(b) => {
                dst.extend_from_slice(b"$");
                dst.extend_from_slice(b.len().to_string().as_bytes());
                dst.extend_from_slice(CRLF);
                dst.extend_from_slice(&b);
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Null => match self.version {
                RespVersion::Resp2 => dst.extend_from_slice(b"$-1\r\n"),
                RespVersion::Resp3 => dst.extend_from_slice(b"_\r\n"),
            },
            RespFrame::Array(arr) => self.encode_aggregate(b"*", arr, dst)?,
            RespFrame::Push(items) => match self.version {
                RespVersion::Resp2 => self.encode_aggregate(b"*", items, dst)?,
                RespVersion::Resp3 => self.encode_aggregate(b">", items, dst)?,
            },
        }
        Ok(())
    }
}

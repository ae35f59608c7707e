// src/connection/handle.rs

//! The network-side identity of a client and its out-of-band message queue.
//!
//! A `Connection` is shared (`Arc`) between the context that owns it, the routing index
//! and the per-shard monitor registries. Anything pushed into its queue is written to the
//! socket by the connection's writer task, independent of the request/reply flow.

use crate::core::protocol::RespValue;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::mpsc;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// The listener a connection was accepted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Main,
    Memcache,
    Admin,
}

/// A message delivered to a client outside of a command reply.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Message {
        channel: Bytes,
        payload: Bytes,
    },
    PMessage {
        pattern: Bytes,
        channel: Bytes,
        payload: Bytes,
    },
    Monitor(Bytes),
}

impl From<PushMessage> for RespValue {
    fn from(msg: PushMessage) -> Self {
        match msg {
            PushMessage::Message { channel, payload } => RespValue::Push(vec![
                RespValue::BulkString(Bytes::from_static(b"message")),
                RespValue::BulkString(channel),
                RespValue::BulkString(payload),
            ]),
            PushMessage::PMessage {
                pattern,
                channel,
                payload,
            } => RespValue::Push(vec![
                RespValue::BulkString(Bytes::from_static(b"pmessage")),
                RespValue::BulkString(pattern),
                RespValue::BulkString(channel),
                RespValue::BulkString(payload),
            ]),
            // Monitor output is a status line, not a push.
            PushMessage::Monitor(line) => {
                RespValue::SimpleString(String::from_utf8_lossy(&line).into_owned())
            }
        }
    }
}

#[derive(Debug)]
pub struct Connection {
    id: u64,
    addr: Option<SocketAddr>,
    listener: ListenerKind,
    privileged: bool,
    outbox: mpsc::UnboundedSender<PushMessage>,
    queued: Arc<AtomicUsize>,
}

impl Connection {
    /// Creates a connection handle and the receiving end of its push queue.
    pub fn new(
        addr: Option<SocketAddr>,
        listener: ListenerKind,
        privileged: bool,
    ) -> (Arc<Self>, PushReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicUsize::new(0));
        let conn = Arc::new(Self {
            id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
            addr,
            listener,
            privileged,
            outbox: tx,
            queued: Arc::clone(&queued),
        });
        (conn, PushReceiver { rx, queued })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    pub fn listener(&self) -> ListenerKind {
        self.listener
    }

    /// Privileged connections bypass ACL checks.
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    pub fn is_main_or_memcache(&self) -> bool {
        matches!(self.listener, ListenerKind::Main | ListenerKind::Memcache)
    }

    /// Queues a message for the client. Returns false once the client has gone away.
    pub fn push(&self, msg: PushMessage) -> bool {
        // Count first so the writer never decrements below zero.
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.outbox.send(msg).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Messages queued but not yet taken by the writer.
    pub fn queued_len(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }
}

/// The writer-side end of a connection's push queue.
#[derive(Debug)]
pub struct PushReceiver {
    rx: mpsc::UnboundedReceiver<PushMessage>,
    queued: Arc<AtomicUsize>,
}

impl PushReceiver {
    pub async fn recv(&mut self) -> Option<PushMessage> {
        let msg = self.rx.recv().await?;
        self.queued.fetch_sub(1, Ordering::Relaxed);
        Some(msg)
    }

    pub fn try_recv(&mut self) -> Option<PushMessage> {
        let msg = self.rx.try_recv().ok()?;
        self.queued.fetch_sub(1, Ordering::Relaxed);
        Some(msg)
    }
}

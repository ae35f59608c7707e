// src/connection/state.rs

//! Defines the mutable per-connection state: the MULTI/EXEC body, script bookkeeping,
//! pub/sub subscriptions, client-side caching and the squashing back-reference.

use super::context::ConnectionContext;
use crate::core::memory::HeapSize;
use crate::core::{DbIndex, StoredCmd};
use bytes::Bytes;
use mlua::Lua;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where a connection is in the MULTI/EXEC lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecState {
    #[default]
    Inactive,
    /// Between MULTI and EXEC: commands are queued.
    Collect,
    /// EXEC is running the queued body.
    Running,
}

/// Transaction state of a connection.
#[derive(Debug, Default)]
pub struct ExecInfo {
    pub state: ExecState,
    /// Commands queued since MULTI, owning their arguments.
    pub body: Vec<StoredCmd<'static>>,
    /// True if any queued command writes.
    pub is_write: bool,
    pub watched_keys: Vec<(DbIndex, Bytes)>,
    /// Set by shard threads when a watched key is modified.
    pub watched_dirty: Arc<AtomicBool>,
    /// Number of watched keys that existed when WATCH ran.
    pub watched_existed: u32,
    /// An interpreter reserved for EVAL calls inside the body.
    pub preborrowed_interpreter: Option<Lua>,
}

impl ExecInfo {
    pub fn is_collecting(&self) -> bool {
        self.state == ExecState::Collect
    }

    pub fn is_running(&self) -> bool {
        self.state == ExecState::Running
    }

    /// Queues a command for EXEC.
    pub fn add_command(&mut self, cmd: StoredCmd<'_>) {
        self.is_write |= cmd.cid().is_write();
        self.body.push(cmd.to_owned_cmd());
    }

    pub fn is_watched_dirty(&self) -> bool {
        self.watched_dirty.load(Ordering::Relaxed)
    }

    /// A handle shard threads use to flag a watched key as modified.
    pub fn watched_dirty_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.watched_dirty)
    }

    /// Resets the transaction state. The interpreter must have been released first.
    pub fn clear(&mut self) {
        debug_assert!(
            self.preborrowed_interpreter.is_none(),
            "interpreter must be released before clearing exec state"
        );
        self.state = ExecState::Inactive;
        self.body.clear();
        self.is_write = false;
        self.clear_watched();
    }

    pub fn clear_watched(&mut self) {
        self.watched_keys.clear();
        self.watched_dirty.store(false, Ordering::Relaxed);
        self.watched_existed = 0;
    }

    pub fn used_memory(&self) -> usize {
        self.body.heap_size() + self.watched_keys.heap_size()
    }
}

/// Bookkeeping for a running script.
#[derive(Debug, Default)]
pub struct ScriptInfo {
    /// Keys (or hash tags) the script declared up front.
    pub lock_tags: HashSet<Bytes>,
    /// Commands the script issued without waiting for their reply.
    pub async_cmds: Vec<StoredCmd<'static>>,
    pub async_cmds_heap_mem: usize,
    pub async_cmds_heap_limit: usize,
}

impl ScriptInfo {
    pub fn new(async_cmds_heap_limit: usize) -> Self {
        Self {
            async_cmds_heap_limit,
            ..Default::default()
        }
    }

    /// Queues an async command. Returns true once the queue is over its heap limit and
    /// must be flushed.
    pub fn add_async_cmd(&mut self, cmd: StoredCmd<'_>) -> bool {
        let cmd = cmd.to_owned_cmd();
        self.async_cmds_heap_mem += cmd.used_memory();
        self.async_cmds.push(cmd);
        self.async_cmds_heap_mem > self.async_cmds_heap_limit
    }

    pub fn take_async_cmds(&mut self) -> Vec<StoredCmd<'static>> {
        self.async_cmds_heap_mem = 0;
        std::mem::take(&mut self.async_cmds)
    }

    pub fn used_memory(&self) -> usize {
        self.lock_tags.heap_size() + self.async_cmds_heap_mem
    }
}

impl HeapSize for ScriptInfo {
    fn heap_size(&self) -> usize {
        self.used_memory()
    }
}

/// Channels and patterns a connection is subscribed to.
#[derive(Debug, Default)]
pub struct SubscribeInfo {
    pub channels: HashSet<Bytes>,
    pub patterns: HashSet<Bytes>,
}

impl SubscribeInfo {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.patterns.is_empty()
    }

    pub fn subscription_count(&self) -> usize {
        self.channels.len() + self.patterns.len()
    }

    pub fn used_memory(&self) -> usize {
        self.channels.heap_size() + self.patterns.heap_size()
    }
}

impl HeapSize for SubscribeInfo {
    fn heap_size(&self) -> usize {
        self.used_memory()
    }
}

/// The `CLIENT TRACKING` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingOption {
    /// Track every key read.
    #[default]
    None,
    /// Track only after `CLIENT CACHING yes`.
    OptIn,
    /// Track unless `CLIENT CACHING no` was sent.
    OptOut,
}

/// Client-side caching state.
///
/// Every command increments `seq_num`. `CLIENT CACHING` records the sequence number it
/// ran at, so the directive applies to the one command that follows it.
#[derive(Debug, Clone, Default)]
pub struct ClientTracking {
    tracking_enabled: bool,
    option: TrackingOption,
    noloop: bool,
    seq_num: u64,
    caching_seq_num: u64,
}

impl ClientTracking {
    pub fn enable(&mut self, option: TrackingOption, noloop: bool) {
        self.tracking_enabled = true;
        self.option = option;
        self.noloop = noloop;
    }

    pub fn disable(&mut self) {
        *self = Self {
            seq_num: self.seq_num,
            ..Self::default()
        };
    }

    pub fn is_tracking_on(&self) -> bool {
        self.tracking_enabled
    }

    pub fn option(&self) -> TrackingOption {
        self.option
    }

    pub fn noloop(&self) -> bool {
        self.noloop
    }

    /// Records a `CLIENT CACHING` directive issued by the current command.
    pub fn record_caching_directive(&mut self) {
        self.caching_seq_num = self.seq_num;
    }

    pub fn increment_seq_num(&mut self) {
        self.seq_num += 1;
    }

    pub fn seq_num(&self) -> u64 {
        self.seq_num
    }

    pub fn caching_seq_num(&self) -> u64 {
        self.caching_seq_num
    }

    /// Whether keys read by the current command should be tracked for invalidation.
    pub fn should_track_keys(&self) -> bool {
        if !self.tracking_enabled || self.noloop {
            return false;
        }
        let directive_applies = self.seq_num == self.caching_seq_num + 1;
        match self.option {
            TrackingOption::None => true,
            TrackingOption::OptIn => directive_applies,
            TrackingOption::OptOut => !directive_applies,
        }
    }
}

/// Links a squashed sub-execution back to the context it runs on behalf of.
#[derive(Debug, Clone, Copy)]
pub struct SquashingInfo<'p> {
    pub owner: &'p ConnectionContext<'p>,
}

/// Everything about a connection that commands mutate as they run.
#[derive(Debug, Default)]
pub struct ConnectionState<'p> {
    pub db_index: DbIndex,
    pub exec_info: ExecInfo,
    pub script_info: Option<Box<ScriptInfo>>,
    /// Present iff at least one channel or pattern subscription is active.
    pub subscribe_info: Option<Box<SubscribeInfo>>,
    pub tracking_info: ClientTracking,
    pub squashing_info: Option<SquashingInfo<'p>>,
}

impl ConnectionState<'_> {
    pub fn used_memory(&self) -> usize {
        self.exec_info.used_memory()
            + self.script_info.heap_size()
            + self.subscribe_info.heap_size()
    }
}

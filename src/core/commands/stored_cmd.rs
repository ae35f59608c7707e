// src/core/commands/stored_cmd.rs

//! Captures a single command invocation for immediate or deferred execution.
//!
//! A `StoredCmd` either borrows the caller's argument slices (the "fire immediately" path)
//! or owns a tightly packed copy of them (MULTI bodies, script-issued async commands,
//! replication buffering). Owned arguments live in one contiguous buffer plus a list of
//! per-argument lengths; argument `i` starts at the sum of the lengths before it.

use super::descriptor::{CommandId, ReplyMode};
use bytes::Bytes;
use smallvec::SmallVec;
use std::mem::size_of;
use std::sync::Arc;

/// Total argument bytes that are packed inside the `StoredCmd` itself without a heap
/// allocation.
pub const INLINE_BUFFER_CAPACITY: usize = 32;

/// Number of argument lengths kept inline before the length list moves to the heap.
pub const INLINE_ARG_COUNT: usize = 4;

/// A borrowed view over a command's arguments.
pub type CmdArgList<'a> = &'a [&'a [u8]];

/// Reusable scratch storage for materializing owned arguments.
pub type CmdArgVec<'a> = Vec<&'a [u8]>;

#[derive(Debug, Clone)]
struct OwnedArgs {
    buffer: SmallVec<[u8; INLINE_BUFFER_CAPACITY]>,
    sizes: SmallVec<[usize; INLINE_ARG_COUNT]>,
}

impl OwnedArgs {
    fn pack(args: &[&[u8]]) -> Self {
        let total_size = args.iter().map(|arg| arg.len()).sum();
        let mut buffer = SmallVec::with_capacity(total_size);
        let mut sizes = SmallVec::with_capacity(args.len());
        for arg in args {
            buffer.extend_from_slice(arg);
            sizes.push(arg.len());
        }
        Self { buffer, sizes }
    }

    /// Returns the argument at `offset..offset + size`, clamped to the buffer's extent.
    fn slice(&self, offset: usize, size: usize) -> &[u8] {
        let len = self.buffer.len();
        let start = offset.min(len);
        let end = offset.saturating_add(size).min(len);
        &self.buffer[start..end]
    }

    fn heap_bytes(&self) -> usize {
        let buffer_size = if self.buffer.spilled() {
            self.buffer.capacity()
        } else {
            0
        };
        let sizes_size = if self.sizes.spilled() {
            self.sizes.capacity() * size_of::<usize>()
        } else {
            0
        };
        buffer_size + sizes_size
    }
}

#[derive(Debug, Clone)]
enum ArgStorage<'a> {
    /// Slices into memory owned by the caller.
    Borrowed(CmdArgList<'a>),
    /// A packed private copy.
    Owned(OwnedArgs),
}

/// A captured command: descriptor handle, arguments and reply policy.
#[derive(Debug, Clone)]
pub struct StoredCmd<'a> {
    cid: Arc<CommandId>,
    args: ArgStorage<'a>,
    reply_mode: ReplyMode,
}

impl<'a> StoredCmd<'a> {
    /// Captures `args` with a full reply policy, copying them when `own_args` is set.
    pub fn new(cid: Arc<CommandId>, own_args: bool, args: CmdArgList<'a>) -> Self {
        if own_args {
            StoredCmd {
                cid,
                args: ArgStorage::Owned(OwnedArgs::pack(args)),
                reply_mode: ReplyMode::Full,
            }
        } else {
            Self::borrowed(cid, args, ReplyMode::Full)
        }
    }

    /// Captures `args` without copying. The caller's buffer must outlive the command.
    pub fn borrowed(cid: Arc<CommandId>, args: CmdArgList<'a>, reply_mode: ReplyMode) -> Self {
        Self {
            cid,
            args: ArgStorage::Borrowed(args),
            reply_mode,
        }
    }

    /// Materializes the arguments as a list of slices.
    ///
    /// Owned arguments are rebuilt into `scratch`, which callers can keep around to avoid
    /// reallocating across commands. Borrowed arguments are returned as-is and `scratch`
    /// is left untouched.
    pub fn arg_list<'s, 'v>(&'s self, scratch: &'v mut CmdArgVec<'s>) -> &'v [&'s [u8]] {
        match &self.args {
            ArgStorage::Owned(own) => {
                scratch.clear();
                let mut offset = 0;
                for &size in own.sizes.iter() {
                    scratch.push(own.slice(offset, size));
                    offset += size;
                }
                &scratch[..]
            }
            ArgStorage::Borrowed(args) => *args,
        }
    }

    /// Returns a copy of the first argument, or an empty buffer if there is none.
    pub fn first_arg(&self) -> Bytes {
        match &self.args {
            ArgStorage::Owned(own) => own
                .sizes
                .first()
                .map(|&size| Bytes::copy_from_slice(own.slice(0, size)))
                .unwrap_or_default(),
            ArgStorage::Borrowed(args) => args
                .first()
                .map(|arg| Bytes::copy_from_slice(arg))
                .unwrap_or_default(),
        }
    }

    pub fn num_args(&self) -> usize {
        match &self.args {
            ArgStorage::Owned(own) => own.sizes.len(),
            ArgStorage::Borrowed(args) => args.len(),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.args, ArgStorage::Owned(_))
    }

    pub fn cid(&self) -> &Arc<CommandId> {
        &self.cid
    }

    pub fn reply_mode(&self) -> ReplyMode {
        self.reply_mode
    }

    /// Heap bytes held by this command.
    ///
    /// Arguments packed inline contribute nothing; a borrowed command owns nothing.
    pub fn used_memory(&self) -> usize {
        match &self.args {
            ArgStorage::Owned(own) => own.heap_bytes(),
            ArgStorage::Borrowed(_) => 0,
        }
    }

    /// Detaches the command from the caller's buffer, packing a copy if needed.
    pub fn to_owned_cmd(&self) -> StoredCmd<'static> {
        let args = match &self.args {
            ArgStorage::Owned(own) => own.clone(),
            ArgStorage::Borrowed(args) => OwnedArgs::pack(args),
        };
        StoredCmd {
            cid: Arc::clone(&self.cid),
            args: ArgStorage::Owned(args),
            reply_mode: self.reply_mode,
        }
    }
}

impl StoredCmd<'static> {
    /// Captures `args` by packing a private copy of them.
    pub fn owned(cid: Arc<CommandId>, args: &[&[u8]], reply_mode: ReplyMode) -> Self {
        Self {
            cid,
            args: ArgStorage::Owned(OwnedArgs::pack(args)),
            reply_mode,
        }
    }

    /// Adopts an already packed buffer.
    ///
    /// `sizes` must describe the arguments as contiguous, in-order slices that cover the
    /// whole buffer. This is only checked in debug builds. In release builds a mismatch is
    /// not detected: argument boundaries come out wrong, and any argument running past the
    /// end of the buffer is cut short at the buffer's end.
    pub fn from_packed(
        buffer: Vec<u8>,
        cid: Arc<CommandId>,
        sizes: &[usize],
        reply_mode: ReplyMode,
    ) -> Self {
        debug_assert_eq!(
            sizes.iter().sum::<usize>(),
            buffer.len(),
            "packed arguments must be contiguous and cover the whole buffer"
        );
        Self {
            cid,
            args: ArgStorage::Owned(OwnedArgs {
                buffer: SmallVec::from_vec(buffer),
                sizes: SmallVec::from_slice(sizes),
            }),
            reply_mode,
        }
    }
}

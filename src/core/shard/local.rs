// src/core/shard/local.rs

//! State owned by a single shard thread.

use super::monitors::MonitorsRepo;
use crate::core::scripting::InterpreterPool;
use std::cell::RefCell;

thread_local! {
    static SHARD_LOCAL: RefCell<Option<ShardLocal>> = const { RefCell::new(None) };
}

#[derive(Debug)]
pub struct ShardLocal {
    index: u32,
    pub monitors: MonitorsRepo,
    pub interpreters: InterpreterPool,
}

impl ShardLocal {
    pub(crate) fn install(index: u32, interpreters_per_shard: usize) {
        SHARD_LOCAL.with(|cell| {
            *cell.borrow_mut() = Some(ShardLocal {
                index,
                monitors: MonitorsRepo::default(),
                interpreters: InterpreterPool::new(interpreters_per_shard),
            });
        });
    }

    pub(crate) fn uninstall() {
        SHARD_LOCAL.with(|cell| cell.borrow_mut().take());
    }

    /// Runs `f` against this thread's shard state.
    ///
    /// Returns `None` off a shard thread. Calls must not nest.
    pub fn with<R>(f: impl FnOnce(&mut ShardLocal) -> R) -> Option<R> {
        SHARD_LOCAL.with(|cell| cell.borrow_mut().as_mut().map(f))
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

/// The index of the shard running the calling thread.
pub fn current_index() -> Option<u32> {
    ShardLocal::with(|local| local.index)
}

// src/core/scripting/interpreter_pool.rs

//! A per-shard pool of Lua interpreters.
//!
//! Creating a Lua state is comparatively expensive, so interpreters are reused. A
//! connection running a MULTI block that contains EVAL borrows one up front and gives it
//! back when the transaction finishes.

use crate::core::metrics::INTERPRETERS_BORROWED;
use mlua::Lua;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct InterpreterPool {
    free: Vec<Lua>,
    max_idle: usize,
    created: usize,
}

impl InterpreterPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Vec::with_capacity(max_idle),
            max_idle,
            created: 0,
        }
    }

    /// Takes an idle interpreter, creating a fresh one when none is available.
    pub fn borrow(&mut self) -> Lua {
        INTERPRETERS_BORROWED.inc();
        self.free.pop().unwrap_or_else(|| {
            self.created += 1;
            debug!("Creating Lua interpreter #{}", self.created);
            Lua::new()
        })
    }

    /// Returns an interpreter. Interpreters beyond the idle limit are dropped.
    pub fn release(&mut self, lua: Lua) {
        INTERPRETERS_BORROWED.dec();
        if self.free.len() >= self.max_idle {
            return;
        }
        if let Err(e) = lua.gc_collect() {
            warn!("Discarding Lua interpreter after failed collection: {}", e);
            return;
        }
        self.free.push(lua);
    }

    pub fn idle(&self) -> usize {
        self.free.len()
    }

    /// Interpreters created over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.created
    }
}

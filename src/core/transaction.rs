// src/core/transaction.rs

//! The handle of an in-flight multi-shard transaction.
//!
//! Execution itself (lock acquisition, hops, ordering) belongs to the transaction engine.
//! The connection core only needs something to point squashed sub-executions at.

use crate::core::DbIndex;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TXID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct Transaction {
    txid: u64,
    db_index: DbIndex,
    /// Shards that hold at least one key of this transaction.
    shards: Vec<u32>,
}

impl Transaction {
    pub fn new(db_index: DbIndex, mut shards: Vec<u32>) -> Self {
        shards.sort_unstable();
        shards.dedup();
        Self {
            txid: NEXT_TXID.fetch_add(1, Ordering::Relaxed),
            db_index,
            shards,
        }
    }

    pub fn txid(&self) -> u64 {
        self.txid
    }

    pub fn db_index(&self) -> DbIndex {
        self.db_index
    }

    pub fn shards(&self) -> &[u32] {
        &self.shards
    }

    pub fn unique_shard_count(&self) -> usize {
        self.shards.len()
    }
}

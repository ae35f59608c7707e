// src/connection/context.rs

//! The per-client execution context.
//!
//! A root context is created for every accepted connection and lives as long as it does.
//! Multi-key commands that fan out across shards fork short-lived child contexts
//! (`new_squashed`) that borrow their parent and never outlive it.

use super::handle::Connection;
use super::state::{ConnectionState, SquashingInfo};
use crate::core::acl::{AclKeys, AclPubSub, KeyOp, UserCredentials, none_commands};
use crate::core::metrics::INTERPRETERS_BORROWED;
use crate::core::namespace::Namespace;
use crate::core::shard::ShardLocal;
use crate::core::state::ServerState;
use crate::core::transaction::Transaction;
use crate::core::{CommandId, DbIndex, SpinelError};
use std::mem::size_of;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct ConnectionContext<'p> {
    id: u64,
    pub(super) state: Arc<ServerState>,
    conn: Option<Arc<Connection>>,
    pub conn_state: ConnectionState<'p>,
    transaction: Option<&'p Transaction>,

    /// Per-family command bitmap.
    pub acl_commands: Vec<u64>,
    pub keys: AclKeys,
    pub pub_sub: AclPubSub,
    pub acl_db_idx: DbIndex,
    pub ns: Option<Arc<Namespace>>,
    pub skip_acl_validation: bool,
    pub has_main_or_memcache_listener: bool,

    /// 1 while the context holds any subscription, 0 otherwise.
    pub subscriptions: u32,
    pub(super) monitor: bool,
    pub authed_username: String,
}

impl ConnectionContext<'static> {
    /// Creates the root context for a client connection.
    ///
    /// An empty command bitmap in `cred` means the user's permissions were never resolved,
    /// in which case nothing is permitted.
    pub fn new(
        state: Arc<ServerState>,
        owner: Option<Arc<Connection>>,
        cred: UserCredentials,
    ) -> Self {
        let (skip_acl_validation, has_main_or_memcache_listener) = owner
            .as_ref()
            .map_or((false, false), |conn| {
                (conn.is_privileged(), conn.is_main_or_memcache())
            });

        let acl_commands = if cred.acl_commands.is_empty() {
            none_commands()
        } else {
            cred.acl_commands
        };

        state.stats.increment_total_contexts();
        let ns = Some(Arc::clone(&state.default_namespace));

        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            state,
            conn: owner,
            conn_state: ConnectionState::default(),
            transaction: None,
            acl_commands,
            keys: cred.keys,
            pub_sub: cred.pub_sub,
            acl_db_idx: cred.db,
            ns,
            skip_acl_validation,
            has_main_or_memcache_listener,
            subscriptions: 0,
            monitor: false,
            authed_username: String::new(),
        }
    }
}

impl<'p> ConnectionContext<'p> {
    /// Forks a child context for a squashed sub-execution.
    ///
    /// The child copies the parent's permissions and namespace. Without a parent it gets
    /// the most restrictive permissions. With a carrier transaction it also inherits the
    /// parent's selected database and points back at the parent. The parent is not changed.
    pub fn new_squashed(
        state: Arc<ServerState>,
        parent: Option<&'p ConnectionContext<'p>>,
        tx: Option<&'p Transaction>,
    ) -> Self {
        debug_assert!(
            tx.is_none() || parent.is_some(),
            "a squashing transaction needs an owner context"
        );
        state.stats.increment_total_squashed_contexts();

        let mut ctx = Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            state,
            conn: None,
            conn_state: ConnectionState::default(),
            transaction: tx,
            acl_commands: none_commands(),
            keys: AclKeys::default(),
            pub_sub: AclPubSub::default(),
            acl_db_idx: 0,
            ns: None,
            skip_acl_validation: false,
            has_main_or_memcache_listener: false,
            subscriptions: 0,
            monitor: false,
            authed_username: String::new(),
        };

        if let Some(owner) = parent {
            ctx.acl_commands = owner.acl_commands.clone();
            ctx.keys = owner.keys.clone();
            ctx.pub_sub = owner.pub_sub.clone();
            ctx.skip_acl_validation = owner.skip_acl_validation;
            ctx.acl_db_idx = owner.acl_db_idx;
            ctx.ns = owner.ns.clone();
            if let Some(conn) = owner.conn() {
                ctx.has_main_or_memcache_listener = conn.is_main_or_memcache();
            }
            if tx.is_some() {
                ctx.conn_state.db_index = owner.conn_state.db_index;
                ctx.conn_state.squashing_info = Some(SquashingInfo { owner });
            }
        }

        ctx
    }

    /// Process-unique id of this context.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub fn conn(&self) -> Option<&Arc<Connection>> {
        self.conn.as_ref()
    }

    /// The client id of the owning connection, `0` for contexts without one.
    pub fn client_id(&self) -> u64 {
        self.conn.as_ref().map_or(0, |conn| conn.id())
    }

    pub fn transaction(&self) -> Option<&'p Transaction> {
        self.transaction
    }

    /// The context this one was forked from, if it runs a squashed sub-execution.
    pub fn squashing_owner(&self) -> Option<&'p ConnectionContext<'p>> {
        self.conn_state.squashing_info.map(|info| info.owner)
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor
    }

    pub fn is_command_permitted(&self, cid: &CommandId) -> bool {
        if self.skip_acl_validation {
            return true;
        }
        self.acl_commands
            .get(cid.acl_family())
            .is_some_and(|family| family & cid.acl_bit() != 0)
    }

    /// Reserves an interpreter from this shard's pool for the rest of the transaction.
    pub fn preborrow_interpreter(&mut self) -> Result<(), SpinelError> {
        if self.conn_state.exec_info.preborrowed_interpreter.is_some() {
            return Ok(());
        }
        let lua = ShardLocal::with(|local| local.interpreters.borrow())
            .ok_or(SpinelError::NotOnShardThread)?;
        self.conn_state.exec_info.preborrowed_interpreter = Some(lua);
        Ok(())
    }

    /// Hands a preborrowed interpreter back to the shard's pool.
    pub fn release_interpreter(&mut self) {
        let Some(lua) = self.conn_state.exec_info.preborrowed_interpreter.take() else {
            return;
        };
        let released = ShardLocal::with(move |local| local.interpreters.release(lua));
        if released.is_none() {
            INTERPRETERS_BORROWED.dec();
            warn!(
                "Context {} released an interpreter off its shard; dropping it",
                self.id
            );
        }
    }

    /// Tears down subscriptions and monitor registration when the client goes away.
    pub async fn on_close(&mut self) -> Result<(), SpinelError> {
        self.unsubscribe_everything();
        if self.monitor {
            self.change_monitor(false).await?;
        }
        debug!("Context {} closed", self.id);
        Ok(())
    }

    /// Heap bytes owned by this context and its connection state.
    pub fn used_memory(&self) -> usize {
        let key_globs = self.keys.key_globs.capacity() * size_of::<(String, KeyOp)>()
            + self
                .keys
                .key_globs
                .iter()
                .map(|(glob, _)| glob.capacity())
                .sum::<usize>();
        let channel_globs = self.pub_sub.globs.capacity() * size_of::<(String, bool)>()
            + self
                .pub_sub
                .globs
                .iter()
                .map(|(glob, _)| glob.capacity())
                .sum::<usize>();

        self.authed_username.capacity()
            + self.acl_commands.capacity() * size_of::<u64>()
            + key_globs
            + channel_globs
            + self.conn_state.used_memory()
    }
}

impl Drop for ConnectionContext<'_> {
    fn drop(&mut self) {
        // `on_close` is the normal path; this only keeps the routing index from holding
        // on to a context that is gone.
        if self.conn_state.subscribe_info.is_some() {
            warn!(
                "Context {} dropped with active subscriptions; removing them",
                self.id
            );
            self.unsubscribe_everything();
        }
        if self.monitor {
            warn!(
                "Context {} dropped while monitoring; call on_close to unregister it",
                self.id
            );
        }
    }
}

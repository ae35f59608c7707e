// src/core/commands/descriptor.rs

//! Defines the immutable command descriptor handed to the connection core by the
//! command registry. The core only ever holds shared handles to it.

use bitflags::bitflags;

bitflags! {
    /// Flags that describe the properties and behavior of a command.
    /// These are used by the router and other subsystems to handle commands appropriately.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct CommandFlags: u32 {
        /// The command modifies the dataset.
        const WRITE          = 1 << 0;
        /// The command only reads data.
        const READONLY       = 1 << 1;
        /// The command is denied if the server is out of memory (`maxmemory` is reached).
        const DENY_OOM       = 1 << 2;
        /// An administrative command.
        const ADMIN          = 1 << 3;
        /// A command related to the Pub/Sub system.
        const PUBSUB         = 1 << 4;
        /// The command should not be propagated to replicas or the AOF file.
        const NO_PROPAGATE   = 1 << 5;
        /// A command related to transactions (e.g., `MULTI`, `EXEC`).
        const TRANSACTION    = 1 << 6;
        /// The command's keys can be moved (used for cluster hashing).
        const MOVABLEKEYS    = 1 << 7;
        /// The command is a scripting command (e.g., `EVAL`).
        const SCRIPTING      = 1 << 8;
    }
}

/// Controls which replies are produced when a captured command finally runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    /// Discard every reply.
    None,
    /// Only errors are sent back to the client.
    OnlyErr,
    /// Every reply is sent.
    #[default]
    Full,
}

/// Static metadata about one command, owned by the command registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandId {
    name: &'static str,
    /// Negative arity means "at least `-arity` arguments", as in the RESP `COMMAND` reply.
    arity: i32,
    flags: CommandFlags,
    acl_family: usize,
    acl_bit: u64,
}

impl CommandId {
    pub fn new(
        name: &'static str,
        arity: i32,
        flags: CommandFlags,
        acl_family: usize,
        acl_bit: u64,
    ) -> Self {
        Self {
            name,
            arity,
            flags,
            acl_family,
            acl_bit,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> i32 {
        self.arity
    }

    pub fn flags(&self) -> CommandFlags {
        self.flags
    }

    pub fn is_write(&self) -> bool {
        self.flags.contains(CommandFlags::WRITE)
    }

    /// The ACL family this command belongs to, used to index the per-family bitmap.
    pub fn acl_family(&self) -> usize {
        self.acl_family
    }

    /// The bit identifying this command within its ACL family.
    pub fn acl_bit(&self) -> u64 {
        self.acl_bit
    }
}

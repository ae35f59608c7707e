// src/core/acl/credentials.rs

use crate::core::DbIndex;
use serde::{Deserialize, Serialize};

/// Number of command families in the ACL bitmap. Each family is one `u64` word.
pub const NUMBER_OF_FAMILIES: usize = 8;

/// A family word with no command permitted.
pub const NONE_COMMANDS: u64 = 0;

/// A family word with every command permitted.
pub const ALL_COMMANDS: u64 = u64::MAX;

/// A bitmap that permits nothing.
pub fn none_commands() -> Vec<u64> {
    vec![NONE_COMMANDS; NUMBER_OF_FAMILIES]
}

/// A bitmap that permits everything.
pub fn all_commands() -> Vec<u64> {
    vec![ALL_COMMANDS; NUMBER_OF_FAMILIES]
}

/// The kind of access a key pattern grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOp {
    Read,
    Write,
    #[default]
    ReadWrite,
}

/// Key patterns (`~pattern`, `%R~pattern`, `allkeys`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclKeys {
    pub all_keys: bool,
    pub key_globs: Vec<(String, KeyOp)>,
}

/// Pub/Sub channel patterns (`&pattern`, `allchannels`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclPubSub {
    pub all_channels: bool,
    /// Each entry is the glob and whether it must match literally.
    pub globs: Vec<(String, bool)>,
}

/// The resolved permissions of an authenticated user at the time a connection was set up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    /// Per-family command bitmap. Empty means "not resolved".
    pub acl_commands: Vec<u64>,
    pub keys: AclKeys,
    pub pub_sub: AclPubSub,
    /// The database the user is bound to.
    pub db: DbIndex,
}

impl UserCredentials {
    /// Credentials of the default user when ACLs are not configured.
    pub fn unrestricted() -> Self {
        Self {
            acl_commands: all_commands(),
            keys: AclKeys {
                all_keys: true,
                key_globs: Vec::new(),
            },
            pub_sub: AclPubSub {
                all_channels: true,
                globs: Vec::new(),
            },
            db: 0,
        }
    }
}

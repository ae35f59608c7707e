// src/core/acl/mod.rs

//! The credential snapshot a connection carries for ACL checks.
//!
//! Evaluating rules lives with the ACL subsystem; connections only hold the resolved
//! per-family command bitmap and the key and channel patterns of the authenticated user.

mod credentials;

pub use credentials::{
    ALL_COMMANDS, AclKeys, AclPubSub, KeyOp, NONE_COMMANDS, NUMBER_OF_FAMILIES, UserCredentials,
    all_commands, none_commands,
};

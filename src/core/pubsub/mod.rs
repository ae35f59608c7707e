// src/core/pubsub/mod.rs

//! Publish-subscribe routing: the shared channel index and the pattern matcher it uses.

pub mod channel_store;
pub mod glob;

pub use channel_store::{ChannelMap, ChannelStore, ChannelStoreUpdater, Subscriber};
pub use glob::glob_match;

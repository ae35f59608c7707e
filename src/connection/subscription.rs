// src/connection/subscription.rs

//! SUBSCRIBE/UNSUBSCRIBE/PSUBSCRIBE/PUNSUBSCRIBE on a connection context.
//!
//! The context keeps its own set of channels and patterns; the shared routing index is
//! updated with one batch per command so publishers never observe a half-applied change.

use super::context::ConnectionContext;
use crate::core::metrics::SUBSCRIBED_CONTEXTS;
use crate::core::protocol::{ReplyBuilder, ReplyScope, RespValue};
use crate::core::pubsub::{ChannelStoreUpdater, Subscriber};
use crate::core::shard::current_index;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// `[action, topic, count]`, with a null topic when there was nothing to act on.
fn subscription_changed(action: &'static str, topic: Option<&[u8]>, count: u32) -> RespValue {
    RespValue::Push(vec![
        RespValue::BulkString(Bytes::from_static(action.as_bytes())),
        topic.map_or(RespValue::Null, |t| {
            RespValue::BulkString(Bytes::copy_from_slice(t))
        }),
        RespValue::Integer(i64::from(count)),
    ])
}

impl ConnectionContext<'_> {
    /// Adds or removes `channels` (or patterns) for this context.
    ///
    /// When `to_reply` is set, the result holds, for each argument in order, the total
    /// number of channels plus patterns held right after that argument was processed.
    /// Otherwise it is empty.
    pub fn change_subscriptions(
        &mut self,
        channels: &[&[u8]],
        pattern: bool,
        to_add: bool,
        to_reply: bool,
    ) -> Vec<u32> {
        let mut result = vec![0; if to_reply { channels.len() } else { 0 }];

        if !to_add && self.conn_state.subscribe_info.is_none() {
            return result;
        }

        if self.conn_state.subscribe_info.is_none() {
            self.conn_state.subscribe_info = Some(Box::default());
            self.subscriptions += 1;
            SUBSCRIBED_CONTEXTS.inc();
        }

        let thread_id = current_index().unwrap_or_else(|| {
            warn!(
                "Context {} changed subscriptions off a shard thread; routing it as shard 0",
                self.id()
            );
            0
        });
        let state = Arc::clone(&self.state);
        let subscriber = Subscriber {
            context_id: self.id(),
            thread_id,
            conn: self.conn().cloned(),
        };
        let mut updater =
            ChannelStoreUpdater::new(&state.channel_store, pattern, to_add, subscriber);

        let Some(sinfo) = self.conn_state.subscribe_info.as_deref_mut() else {
            return result;
        };
        for (i, &channel) in channels.iter().enumerate() {
            let local = if pattern {
                &mut sinfo.patterns
            } else {
                &mut sinfo.channels
            };
            let changed = if to_add {
                local.insert(Bytes::copy_from_slice(channel))
            } else {
                local.remove(channel)
            };
            if changed {
                updater.record(channel);
            }
            if to_reply {
                result[i] = sinfo.subscription_count() as u32;
            }
        }

        updater.apply();
        state.stats.increment_total_subscription_changes();

        // The local set goes only after the routing index no longer refers to it. An
        // empty batch on a fresh context also lands here.
        let now_empty = self
            .conn_state
            .subscribe_info
            .as_ref()
            .is_some_and(|sinfo| sinfo.is_empty());
        if now_empty {
            self.drop_subscribe_info();
        }

        debug!(
            "Context {} {} {} {}",
            self.id(),
            if to_add { "subscribed to" } else { "unsubscribed from" },
            channels.len(),
            if pattern { "patterns" } else { "channels" }
        );
        result
    }

    pub fn change_subscription(
        &mut self,
        to_add: bool,
        to_reply: bool,
        args: &[&[u8]],
        rb: &mut dyn ReplyBuilder,
    ) {
        let result = self.change_subscriptions(args, false, to_add, to_reply);
        if !to_reply {
            return;
        }

        let action = if to_add { "subscribe" } else { "unsubscribe" };
        let mut scope = ReplyScope::new(rb);
        for (channel, count) in args.iter().zip(result) {
            scope.send_value(subscription_changed(action, Some(*channel), count));
        }
    }

    pub fn change_psubscription(
        &mut self,
        to_add: bool,
        to_reply: bool,
        args: &[&[u8]],
        rb: &mut dyn ReplyBuilder,
    ) {
        let result = self.change_subscriptions(args, true, to_add, to_reply);
        if !to_reply {
            return;
        }

        let action = if to_add { "psubscribe" } else { "punsubscribe" };
        if result.is_empty() {
            rb.send_value(subscription_changed(action, None, 0));
            return;
        }

        let mut scope = ReplyScope::new(rb);
        for (pattern, count) in args.iter().zip(result) {
            scope.send_value(subscription_changed(action, Some(*pattern), count));
        }
    }

    /// UNSUBSCRIBE without arguments.
    pub fn unsubscribe_all(&mut self, to_reply: bool, rb: &mut dyn ReplyBuilder) {
        let channels: Vec<Bytes> = self
            .conn_state
            .subscribe_info
            .as_ref()
            .map(|sinfo| sinfo.channels.iter().cloned().collect())
            .unwrap_or_default();

        if to_reply && channels.is_empty() {
            rb.send_value(subscription_changed("unsubscribe", None, 0));
            return;
        }

        let args: Vec<&[u8]> = channels.iter().map(|c| c.as_ref()).collect();
        self.change_subscription(false, to_reply, &args, rb);
    }

    /// PUNSUBSCRIBE without arguments.
    pub fn punsubscribe_all(&mut self, to_reply: bool, rb: &mut dyn ReplyBuilder) {
        let patterns: Vec<Bytes> = self
            .conn_state
            .subscribe_info
            .as_ref()
            .map(|sinfo| sinfo.patterns.iter().cloned().collect())
            .unwrap_or_default();

        if to_reply && patterns.is_empty() {
            rb.send_value(subscription_changed("punsubscribe", None, 0));
            return;
        }

        let args: Vec<&[u8]> = patterns.iter().map(|p| p.as_ref()).collect();
        self.change_psubscription(false, to_reply, &args, rb);
    }

    /// Forgets `channel` locally after the routing index has already dropped this context.
    ///
    /// The channel must currently be subscribed.
    pub fn unsubscribe(&mut self, channel: &[u8]) {
        let Some(sinfo) = self.conn_state.subscribe_info.as_deref_mut() else {
            debug_assert!(false, "unsubscribe without any subscription");
            return;
        };
        let erased = sinfo.channels.remove(channel);
        debug_assert!(erased, "unsubscribe of a channel that is not subscribed");
        if sinfo.is_empty() {
            self.drop_subscribe_info();
        }
    }

    /// Removes every channel and pattern from both the routing index and this context.
    pub(super) fn unsubscribe_everything(&mut self) {
        let Some(sinfo) = self.conn_state.subscribe_info.as_deref() else {
            return;
        };
        let channels: Vec<Bytes> = sinfo.channels.iter().cloned().collect();
        let patterns: Vec<Bytes> = sinfo.patterns.iter().cloned().collect();
        let channels: Vec<&[u8]> = channels.iter().map(|c| c.as_ref()).collect();
        let patterns: Vec<&[u8]> = patterns.iter().map(|p| p.as_ref()).collect();
        self.change_subscriptions(&channels, false, false, false);
        self.change_subscriptions(&patterns, true, false, false);
    }

    fn drop_subscribe_info(&mut self) {
        self.conn_state.subscribe_info = None;
        debug_assert!(self.subscriptions >= 1, "subscription count underflow");
        self.subscriptions = self.subscriptions.saturating_sub(1);
        SUBSCRIBED_CONTEXTS.dec();
    }
}

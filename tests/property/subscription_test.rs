// tests/property/subscription_test.rs

//! Property-based tests for subscription bookkeeping
//! Tests that the routing index always mirrors what each context holds locally

use crate::test_helpers::{TestContext, args};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Subscribe(Vec<&'static str>),
    Unsubscribe(Vec<&'static str>),
    PSubscribe(Vec<&'static str>),
    PUnsubscribe(Vec<&'static str>),
}

const CHANNELS: &[&str] = &["a", "b", "c", "d"];
const PATTERNS: &[&str] = &["a*", "?", "[bc]"];

fn op() -> impl Strategy<Value = Op> {
    let channels = prop::collection::vec(prop::sample::select(CHANNELS), 0..4);
    let patterns = prop::collection::vec(prop::sample::select(PATTERNS), 0..3);
    prop_oneof![
        channels.clone().prop_map(Op::Subscribe),
        channels.prop_map(Op::Unsubscribe),
        patterns.clone().prop_map(Op::PSubscribe),
        patterns.prop_map(Op::PUnsubscribe),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_routing_index_mirrors_local_sets(ops in prop::collection::vec(op(), 1..20)) {
        let test = TestContext::with_shards(1);
        let (mut ctx, _rx) = test.client();
        let store = &test.state.channel_store;

        for op in ops {
            let (topics, pattern, to_add) = match op {
                Op::Subscribe(t) => (t, false, true),
                Op::Unsubscribe(t) => (t, false, false),
                Op::PSubscribe(t) => (t, true, true),
                Op::PUnsubscribe(t) => (t, true, false),
            };
            let counts = ctx.change_subscriptions(&args(&topics), pattern, to_add, true);
            prop_assert_eq!(counts.len(), topics.len());

            let held = ctx
                .conn_state
                .subscribe_info
                .as_ref()
                .map_or(0, |sinfo| sinfo.subscription_count());
            if let Some(last) = counts.last() {
                prop_assert_eq!(*last as usize, held);
            }
            prop_assert_eq!(ctx.subscriptions, u32::from(held > 0));
            prop_assert_eq!(ctx.conn_state.subscribe_info.is_some(), held > 0);

            for channel in CHANNELS {
                let local = ctx
                    .conn_state
                    .subscribe_info
                    .as_ref()
                    .is_some_and(|s| s.channels.contains(channel.as_bytes()));
                prop_assert_eq!(store.num_subscribers(channel.as_bytes()), usize::from(local));
            }
            for pattern in PATTERNS {
                let local = ctx
                    .conn_state
                    .subscribe_info
                    .as_ref()
                    .is_some_and(|s| s.patterns.contains(pattern.as_bytes()));
                let routed = store
                    .pattern_subscribers(pattern.as_bytes())
                    .iter()
                    .any(|s| s.context_id == ctx.id());
                prop_assert_eq!(routed, local);
            }
        }
    }
}

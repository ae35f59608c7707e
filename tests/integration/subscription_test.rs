// tests/integration/subscription_test.rs

use super::test_helpers::{TestContext, args, new_client};
use bytes::Bytes;
use spinelshard::connection::PushMessage;
use spinelshard::core::protocol::{
    BufferedReplyBuilder, CapturingReplyBuilder, RespValue, RespVersion,
};
use std::sync::Arc;

fn frame(action: &'static str, topic: Option<&'static str>, count: i64) -> RespValue {
    RespValue::Push(vec![
        RespValue::BulkString(Bytes::from_static(action.as_bytes())),
        topic.map_or(RespValue::Null, |t| {
            RespValue::BulkString(Bytes::from_static(t.as_bytes()))
        }),
        RespValue::Integer(count),
    ])
}

#[tokio::test]
async fn test_subscribe_counts_and_dedup() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();

    let result = ctx.change_subscriptions(&args(&["a", "b", "a"]), false, true, true);
    assert_eq!(result, vec![1, 2, 2]);
    assert_eq!(ctx.subscriptions, 1);
    assert_eq!(
        ctx.conn_state
            .subscribe_info
            .as_ref()
            .map(|s| s.channels.len()),
        Some(2)
    );
    assert_eq!(test.state.channel_store.num_subscribers(b"a"), 1);
    assert_eq!(test.state.channel_store.num_subscribers(b"b"), 1);
}

#[tokio::test]
async fn test_no_reply_returns_empty_result() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();

    assert!(ctx.change_subscriptions(&args(&["a"]), false, true, false).is_empty());
    assert!(ctx.conn_state.subscribe_info.is_some());
}

#[tokio::test]
async fn test_unsubscribe_without_state_is_zero_filled() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();

    let result = ctx.change_subscriptions(&args(&["x", "y"]), false, false, true);
    assert_eq!(result, vec![0, 0]);
    assert!(ctx.conn_state.subscribe_info.is_none());
    assert_eq!(ctx.subscriptions, 0);

    assert!(ctx.change_subscriptions(&args(&["x"]), true, false, false).is_empty());
}

#[tokio::test]
async fn test_channels_and_patterns_share_one_subscribe_info() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();

    ctx.change_subscriptions(&args(&["a"]), false, true, true);
    assert_eq!(ctx.change_subscriptions(&args(&["p*"]), true, true, true), vec![2]);
    assert_eq!(ctx.subscriptions, 1);

    // Dropping the last channel keeps the state alive while a pattern remains.
    assert_eq!(ctx.change_subscriptions(&args(&["a"]), false, false, true), vec![1]);
    assert!(ctx.conn_state.subscribe_info.is_some());
    assert_eq!(ctx.subscriptions, 1);

    assert_eq!(ctx.change_subscriptions(&args(&["p*"]), true, false, true), vec![0]);
    assert!(ctx.conn_state.subscribe_info.is_none());
    assert_eq!(ctx.subscriptions, 0);
    assert_eq!(test.state.channel_store.pattern_count(), 0);
}

#[tokio::test]
async fn test_subscribe_replies_are_batched() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();
    let mut rb = CapturingReplyBuilder::new();

    ctx.change_subscription(true, true, &args(&["a", "b"]), &mut rb);
    assert_eq!(
        rb.values(),
        &[
            frame("subscribe", Some("a"), 1),
            frame("subscribe", Some("b"), 2)
        ]
    );
    assert_eq!(rb.scopes_closed(), 1);

    let mut rb = CapturingReplyBuilder::new();
    ctx.change_subscription(false, true, &args(&["b", "zzz"]), &mut rb);
    assert_eq!(
        rb.values(),
        &[
            frame("unsubscribe", Some("b"), 1),
            frame("unsubscribe", Some("zzz"), 1)
        ]
    );
}

#[tokio::test]
async fn test_no_reply_sends_nothing() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();
    let mut rb = CapturingReplyBuilder::new();

    ctx.change_subscription(true, false, &args(&["a"]), &mut rb);
    ctx.change_psubscription(true, false, &args(&["a*"]), &mut rb);
    ctx.unsubscribe_all(false, &mut rb);
    ctx.punsubscribe_all(false, &mut rb);
    assert!(rb.values().is_empty());
    assert!(ctx.conn_state.subscribe_info.is_none());
}

#[tokio::test]
async fn test_psubscribe_replies() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();
    let mut rb = CapturingReplyBuilder::new();

    ctx.change_psubscription(true, true, &args(&["n*", "w*"]), &mut rb);
    assert_eq!(
        rb.values(),
        &[
            frame("psubscribe", Some("n*"), 1),
            frame("psubscribe", Some("w*"), 2)
        ]
    );

    let mut rb = CapturingReplyBuilder::new();
    ctx.change_psubscription(false, true, &[], &mut rb);
    assert_eq!(rb.values(), &[frame("punsubscribe", None, 0)]);
}

#[tokio::test]
async fn test_unsubscribe_all_on_empty_state() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();

    let mut rb = CapturingReplyBuilder::new();
    ctx.unsubscribe_all(true, &mut rb);
    assert_eq!(rb.values(), &[frame("unsubscribe", None, 0)]);
    assert!(ctx.conn_state.subscribe_info.is_none());

    let mut rb = CapturingReplyBuilder::new();
    ctx.punsubscribe_all(true, &mut rb);
    assert_eq!(rb.values(), &[frame("punsubscribe", None, 0)]);
    assert!(ctx.conn_state.subscribe_info.is_none());
    assert_eq!(ctx.subscriptions, 0);
}

#[tokio::test]
async fn test_unsubscribe_all_on_empty_state_resp2_wire_format() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();
    let mut rb = BufferedReplyBuilder::new(RespVersion::Resp2);

    ctx.unsubscribe_all(true, &mut rb);
    let writes = rb.take_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].as_ref(), b"*3\r\n$11\r\nunsubscribe\r\n$-1\r\n:0\r\n");
}

#[tokio::test]
async fn test_unsubscribe_all_removes_every_channel() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();
    let mut rb = CapturingReplyBuilder::new();
    ctx.change_subscription(true, false, &args(&["a", "b", "c"]), &mut rb);
    ctx.change_psubscription(true, false, &args(&["p*"]), &mut rb);

    ctx.unsubscribe_all(true, &mut rb);
    let values = rb.take_values();
    assert_eq!(values.len(), 3);
    // Counts go down by one per channel; the pattern keeps the last count at 1.
    let counts: Vec<_> = values
        .iter()
        .map(|v| match v {
            RespValue::Push(items) => items[2].clone(),
            other => panic!("expected push, got {other:?}"),
        })
        .collect();
    assert_eq!(
        counts,
        vec![
            RespValue::Integer(3),
            RespValue::Integer(2),
            RespValue::Integer(1)
        ]
    );
    assert!(test.state.channel_store.channels(None).is_empty());

    // Only patterns are left, so UNSUBSCRIBE with no arguments answers with a null topic.
    ctx.unsubscribe_all(true, &mut rb);
    assert_eq!(rb.take_values(), vec![frame("unsubscribe", None, 0)]);

    ctx.punsubscribe_all(true, &mut rb);
    assert_eq!(rb.take_values(), vec![frame("punsubscribe", Some("p*"), 0)]);
    assert!(ctx.conn_state.subscribe_info.is_none());
}

#[tokio::test]
async fn test_routing_index_mirrors_local_state() {
    let test = TestContext::new();
    let (mut a, _rx_a) = test.client();
    let (mut b, _rx_b) = test.client();
    let store = &test.state.channel_store;

    a.change_subscriptions(&args(&["x", "y"]), false, true, false);
    b.change_subscriptions(&args(&["y", "z"]), false, true, false);
    a.change_subscriptions(&args(&["y"]), false, false, false);

    let ids = |channel: &[u8]| {
        let mut ids: Vec<u64> = store
            .subscribers(channel)
            .iter()
            .map(|s| s.context_id)
            .collect();
        ids.sort();
        ids
    };
    assert_eq!(ids(b"x"), vec![a.id()]);
    assert_eq!(ids(b"y"), vec![b.id()]);
    assert_eq!(ids(b"z"), vec![b.id()]);
}

#[tokio::test]
async fn test_publish_reaches_subscribed_context() {
    let test = TestContext::new();
    let (mut ctx, mut rx) = test.client();
    ctx.change_subscriptions(&args(&["news"]), false, true, false);
    ctx.change_subscriptions(&args(&["n*"]), true, true, false);

    let delivered = test
        .state
        .channel_store
        .publish(b"news", &Bytes::from_static(b"hello"));
    assert_eq!(delivered, 2);

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    let mut kinds = vec![first, second];
    kinds.sort_by_key(|m| matches!(m, PushMessage::PMessage { .. }));
    assert_eq!(
        kinds[0],
        PushMessage::Message {
            channel: Bytes::from_static(b"news"),
            payload: Bytes::from_static(b"hello"),
        }
    );
    assert_eq!(
        RespValue::from(kinds[1].clone()),
        RespValue::Push(vec![
            RespValue::BulkString(Bytes::from_static(b"pmessage")),
            RespValue::BulkString(Bytes::from_static(b"n*")),
            RespValue::BulkString(Bytes::from_static(b"news")),
            RespValue::BulkString(Bytes::from_static(b"hello")),
        ])
    );
}

#[tokio::test]
async fn test_local_unsubscribe_tears_down_state() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();
    ctx.change_subscriptions(&args(&["a", "b"]), false, true, false);

    ctx.unsubscribe(b"a");
    assert!(ctx.conn_state.subscribe_info.is_some());
    ctx.unsubscribe(b"b");
    assert!(ctx.conn_state.subscribe_info.is_none());
    assert_eq!(ctx.subscriptions, 0);
}

#[tokio::test]
async fn test_on_close_removes_routing_entries() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();
    ctx.change_subscriptions(&args(&["a", "b"]), false, true, false);
    ctx.change_subscriptions(&args(&["p*"]), true, true, false);

    ctx.on_close().await.unwrap();
    assert!(test.state.channel_store.channels(None).is_empty());
    assert_eq!(test.state.channel_store.pattern_count(), 0);
    assert!(ctx.conn_state.subscribe_info.is_none());
    assert_eq!(ctx.subscriptions, 0);
}

#[tokio::test]
async fn test_subscribe_to_nothing_keeps_context_clean() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();

    assert!(ctx.change_subscriptions(&[], false, true, true).is_empty());
    assert!(ctx.conn_state.subscribe_info.is_none());
    assert_eq!(ctx.subscriptions, 0);

    assert!(ctx.change_subscriptions(&[], true, true, false).is_empty());
    assert!(ctx.conn_state.subscribe_info.is_none());
    assert_eq!(ctx.subscriptions, 0);

    let mut rb = CapturingReplyBuilder::new();
    ctx.unsubscribe_all(true, &mut rb);
    assert_eq!(rb.values(), &[frame("unsubscribe", None, 0)]);
    assert_eq!(ctx.subscriptions, 0);
}

#[tokio::test]
async fn test_subscribe_overlapping_sets() {
    let test = TestContext::new();
    let (mut ctx, _rx) = test.client();

    assert_eq!(ctx.change_subscriptions(&args(&["a", "b"]), false, true, true), vec![1, 2]);
    // Counts are running totals: "b" is already held, "c" is new.
    assert_eq!(ctx.change_subscriptions(&args(&["b", "c"]), false, true, true), vec![2, 3]);

    let mut held: Vec<Bytes> = ctx
        .conn_state
        .subscribe_info
        .as_ref()
        .unwrap()
        .channels
        .iter()
        .cloned()
        .collect();
    held.sort();
    assert_eq!(
        held,
        vec![
            Bytes::from_static(b"a"),
            Bytes::from_static(b"b"),
            Bytes::from_static(b"c")
        ]
    );
    assert_eq!(ctx.subscriptions, 1);
}

#[tokio::test]
async fn test_subscriber_is_tagged_with_its_shard() {
    let test = TestContext::with_shards(2);
    let state = Arc::clone(&test.state);
    let thread_ids = test
        .on_shard(1, move || async move {
            let (mut ctx, _rx) = new_client(Arc::clone(&state));
            ctx.change_subscriptions(&args(&["a"]), false, true, false);
            let ids: Vec<u32> = state
                .channel_store
                .subscribers(b"a")
                .iter()
                .map(|s| s.thread_id)
                .collect();
            ctx.on_close().await.unwrap();
            ids
        })
        .await;
    assert_eq!(thread_ids, vec![1]);
}

#[tokio::test]
async fn test_dropped_context_leaves_routing_index() {
    let test = TestContext::new();
    {
        let (mut ctx, _rx) = test.client();
        ctx.change_subscriptions(&args(&["a", "b"]), false, true, false);
        ctx.change_subscriptions(&args(&["p*"]), true, true, false);
        assert_eq!(test.state.channel_store.channels(None).len(), 2);
    }
    assert!(test.state.channel_store.channels(None).is_empty());
    assert_eq!(test.state.channel_store.pattern_count(), 0);
}

// tests/integration/shard_set_test.rs

use super::test_helpers::TestContext;
use parking_lot::Mutex;
use spinelshard::core::SpinelError;
use spinelshard::core::shard::current_index;
use std::sync::Arc;

#[tokio::test]
async fn test_await_brief_runs_on_every_shard() {
    let test = TestContext::with_shards(4);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    test.state
        .shard_set
        .await_brief(move |index| {
            assert_eq!(current_index(), Some(index));
            sink.lock().push(index);
        })
        .await
        .unwrap();

    let mut seen = seen.lock().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_spawn_on_runs_on_target_shard() {
    let test = TestContext::with_shards(3);
    for index in 0..3 {
        let ran_on = test.on_shard(index, || async { current_index() }).await;
        assert_eq!(ran_on, Some(index));
    }
    assert_eq!(current_index(), None);
}

#[tokio::test]
async fn test_await_brief_from_a_shard_task() {
    let test = TestContext::with_shards(2);
    let state = Arc::clone(&test.state);
    let result = test
        .on_shard(0, move || async move { state.shard_set.await_brief(|_| {}).await })
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_spawn_on_unknown_shard() {
    let test = TestContext::with_shards(2);
    let result = test.state.shard_set.spawn_on(5, || async {});
    assert!(matches!(result, Err(SpinelError::ShardUnavailable(5))));
}

#[tokio::test]
async fn test_shard_unavailable_after_shutdown() {
    let test = TestContext::with_shards(2);
    test.state.shutdown();

    let result = test.state.shard_set.await_brief(|_| {}).await;
    assert!(matches!(result, Err(SpinelError::ShardUnavailable(_))));
    assert!(test.state.shard_set.spawn_on(0, || async {}).is_err());
}

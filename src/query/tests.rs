// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use super::{
    CacheEvent, CacheOptions, DiscardReason, EvictionPolicy, QueryCache, QueryDef, QueryStatus, Tag,
};
use crate::entity::EntityAdapter;
use crate::error::{ErrorKind, GatewayError, GatewayResult, StateError};
use crate::gateway::{MemoryGateway, Params, params};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct Item {
    id: String,
}

fn item_id(item: &Item) -> String {
    item.id.clone()
}

const ITEMS: QueryDef<Item> = QueryDef::new("items", &[Tag::Stacks], EntityAdapter::new(item_id));
const OTHERS: QueryDef<Item> = QueryDef::new("others", &[Tag::Commits], EntityAdapter::new(item_id));
const BOTH: QueryDef<Item> = QueryDef::new(
    "both",
    &[Tag::Stacks, Tag::StackBranches],
    EntityAdapter::new(item_id),
);

fn project(id: &str) -> Params {
    params(json!({ "projectId": id }))
}

fn ids(state: &super::QueryState<Item>) -> Vec<String> {
    state
        .data
        .as_ref()
        .map(|data| data.ids().to_vec())
        .unwrap_or_default()
}

fn setup(options: CacheOptions) -> (Arc<MemoryGateway>, QueryCache) {
    let gateway = Arc::new(MemoryGateway::new());
    let cache = QueryCache::new(gateway.clone(), options);
    (gateway, cache)
}

/// Registers a handler returning successive responses; the last one repeats.
fn scripted(gateway: &MemoryGateway, command: &str, responses: Vec<GatewayResult<Value>>) {
    let calls = AtomicUsize::new(0);
    gateway.register_sync(command, move |_| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        responses[n.min(responses.len() - 1)].clone()
    });
}

/// Requests answered by hand, in any order.
#[derive(Clone, Default)]
struct Pending(Arc<Mutex<Vec<Option<oneshot::Sender<GatewayResult<Value>>>>>>);

impl Pending {
    fn register(gateway: &MemoryGateway, command: &str) -> Self {
        let pending = Self::default();
        let queue = pending.clone();
        gateway.register(command, move |_| {
            let (tx, rx) = oneshot::channel();
            queue.0.lock().push(Some(tx));
            async move { rx.await.unwrap_or_else(|_| Ok(json!([]))) }
        });
        pending
    }

    fn len(&self) -> usize {
        self.0.lock().len()
    }

    fn answer(&self, index: usize, result: GatewayResult<Value>) {
        let tx = self.0.lock()[index].take().unwrap();
        let _ = tx.send(result);
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

async fn next_event(events: &flume::Receiver<CacheEvent>, matches: impl Fn(&CacheEvent) -> bool) -> CacheEvent {
    for _ in 0..1000 {
        while let Ok(event) = events.try_recv() {
            if matches(&event) {
                return event;
            }
        }
        tokio::task::yield_now().await;
    }
    panic!("event not received");
}

// =============================================================================
// Coalescing
// =============================================================================

#[tokio::test]
async fn test_concurrent_subscribers_share_one_call() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!([{ "id": "a" }, { "id": "b" }])));

    let mut subs: Vec<_> = (0..3)
        .map(|_| cache.subscribe(&ITEMS, project("p1")).unwrap())
        .collect();
    assert_eq!(subs[0].current().status, QueryStatus::Loading);
    assert!(subs[0].current().is_loading());

    let first = subs[0].settled().await.unwrap();
    assert_eq!(first.status, QueryStatus::Ready);
    assert_eq!(ids(&first), ["a", "b"]);
    for sub in &mut subs[1..] {
        let state = sub.settled().await.unwrap();
        assert!(Arc::ptr_eq(
            state.data.as_ref().unwrap(),
            first.data.as_ref().unwrap()
        ));
    }

    assert_eq!(gateway.call_count("items"), 1);
    assert_eq!(cache.subscriber_count(subs[0].key()), 3);
}

#[tokio::test]
async fn test_subscribe_to_ready_entry_does_not_fetch() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!([{ "id": "a" }])));

    let mut first = cache.subscribe(&ITEMS, project("p1")).unwrap();
    first.settled().await.unwrap();
    let second = cache.subscribe(&ITEMS, project("p1")).unwrap();

    assert_eq!(second.current().status, QueryStatus::Ready);
    assert_eq!(gateway.call_count("items"), 1);
}

#[tokio::test]
async fn test_distinct_params_are_distinct_entries() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!([])));

    let mut p1 = cache.subscribe(&ITEMS, project("p1")).unwrap();
    let mut p2 = cache.subscribe(&ITEMS, project("p2")).unwrap();
    let reordered = cache
        .subscribe(
            &ITEMS,
            params(json!({ "stackId": "s", "projectId": "p1" })),
        )
        .unwrap();
    let same = cache
        .subscribe(
            &ITEMS,
            params(json!({ "projectId": "p1", "stackId": "s" })),
        )
        .unwrap();
    p1.settled().await.unwrap();
    p2.settled().await.unwrap();

    assert_ne!(p1.key(), p2.key());
    assert_eq!(reordered.key(), same.key());
    assert_eq!(cache.len(), 3);
    insta::assert_snapshot!(same.key().to_string(), @r#"items({"projectId":"p1","stackId":"s"})"#);
}

// =============================================================================
// Invalidation
// =============================================================================

#[tokio::test]
async fn test_invalidate_refetches_only_providers() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!([{ "id": "a" }])));
    gateway.register_sync("others", |_| Ok(json!([{ "id": "x" }])));

    let mut items = cache.subscribe(&ITEMS, project("p1")).unwrap();
    let mut others = cache.subscribe(&OTHERS, project("p1")).unwrap();
    items.settled().await.unwrap();
    others.settled().await.unwrap();

    assert_eq!(cache.invalidate(&[Tag::Stacks]), 1);
    let refetching = items.current();
    assert_eq!(refetching.status, QueryStatus::Refetching);
    assert!(refetching.stale);
    assert_eq!(ids(&refetching), ["a"]);

    let state = items.settled().await.unwrap();
    assert!(!state.stale);
    assert_eq!(others.current().status, QueryStatus::Ready);
    assert_eq!(gateway.call_count("items"), 2);
    assert_eq!(gateway.call_count("others"), 1);
}

#[tokio::test]
async fn test_entry_with_several_tags_refetched_once() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("both", |_| Ok(json!([])));

    let mut sub = cache.subscribe(&BOTH, project("p1")).unwrap();
    sub.settled().await.unwrap();
    assert_eq!(cache.tagged(Tag::Stacks), 1);
    assert_eq!(cache.tagged(Tag::StackBranches), 1);

    assert_eq!(cache.invalidate(&[Tag::Stacks, Tag::StackBranches]), 1);
    sub.settled().await.unwrap();
    assert_eq!(gateway.call_count("both"), 2);
}

#[tokio::test]
async fn test_refetch_replaces_rather_than_merges() {
    let (gateway, cache) = setup(CacheOptions::default());
    scripted(
        &gateway,
        "items",
        vec![
            Ok(json!([{ "id": "a" }, { "id": "b" }])),
            Ok(json!([{ "id": "b" }, { "id": "c" }])),
        ],
    );

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();
    cache.invalidate(&[Tag::Stacks]);
    let state = sub.settled().await.unwrap();

    assert_eq!(ids(&state), ["b", "c"]);
}

#[tokio::test]
async fn test_invalidate_without_subscribers_marks_stale_and_refetches_lazily() {
    let (gateway, cache) = setup(CacheOptions::builder().with_eviction(EvictionPolicy::Never).build());
    gateway.register_sync("items", |_| Ok(json!([{ "id": "a" }])));

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();
    drop(sub);

    assert_eq!(cache.invalidate(&[Tag::Stacks]), 0);
    tokio::task::yield_now().await;
    assert_eq!(gateway.call_count("items"), 1);

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    let state = sub.current();
    assert_eq!(state.status, QueryStatus::Refetching);
    assert!(state.stale);
    assert_eq!(ids(&state), ["a"]);

    sub.settled().await.unwrap();
    assert_eq!(gateway.call_count("items"), 2);
}

#[tokio::test]
async fn test_invalidate_emits_event() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!([])));
    let events = cache.events();

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();
    cache.invalidate(&[Tag::Stacks, Tag::Commits]);

    let event = next_event(&events, |e| matches!(e, CacheEvent::Invalidated { .. })).await;
    assert_eq!(
        event,
        CacheEvent::Invalidated {
            tags: vec![Tag::Stacks, Tag::Commits],
            refetching: 1,
            marked: 0,
        }
    );
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_failed_refetch_keeps_last_good_data() {
    let (gateway, cache) = setup(CacheOptions::default());
    let rejected = GatewayError::Rejected {
        command: "items".into(),
        message: "conflict".into(),
    };
    scripted(
        &gateway,
        "items",
        vec![
            Ok(json!([{ "id": "a" }])),
            Err(rejected.clone()),
            Ok(json!([{ "id": "b" }])),
        ],
    );

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();

    cache.invalidate(&[Tag::Stacks]);
    let failed = sub.settled().await.unwrap();
    assert_eq!(failed.status, QueryStatus::Errored);
    assert_eq!(failed.error, Some(rejected));
    assert_eq!(failed.error.as_ref().map(GatewayError::kind), Some(ErrorKind::Domain));
    assert_eq!(ids(&failed), ["a"]);
    assert!(failed.is_error());
    assert!(!failed.is_success());

    cache.invalidate(&[Tag::Stacks]);
    let recovered = sub.settled().await.unwrap();
    assert_eq!(recovered.status, QueryStatus::Ready);
    assert_eq!(recovered.error, None);
    assert_eq!(ids(&recovered), ["b"]);
}

#[tokio::test]
async fn test_first_failure_has_no_data() {
    let (_gateway, cache) = setup(CacheOptions::default());

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    let state = sub.settled().await.unwrap();

    assert_eq!(state.status, QueryStatus::Errored);
    assert!(state.data.is_none());
    insta::assert_snapshot!(state.error.unwrap().to_string(), @"unknown command 'items'");
}

#[tokio::test]
async fn test_malformed_response_is_decode_error() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!({ "id": "a" })));

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    let state = sub.settled().await.unwrap();

    let err = state.error.unwrap();
    assert!(matches!(err, GatewayError::Decode { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout_is_transport_error() {
    let (gateway, cache) = setup(
        CacheOptions::builder()
            .with_request_timeout(Duration::from_millis(250))
            .build(),
    );
    gateway.register("items", |_| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(json!([]))
    });

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    let state = sub.settled().await.unwrap();

    assert_eq!(
        state.error,
        Some(GatewayError::Timeout {
            command: "items".into(),
            timeout_ms: 250,
        })
    );
    assert_eq!(state.error.unwrap().kind(), ErrorKind::Transport);
}

// =============================================================================
// Ordering and cancellation
// =============================================================================

#[tokio::test]
async fn test_out_of_order_resolution_is_discarded() {
    let (gateway, cache) = setup(CacheOptions::default());
    let pending = Pending::register(&gateway, "items");
    let events = cache.events();

    let sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    wait_until(|| pending.len() == 1).await;
    assert!(sub.refetch());
    wait_until(|| pending.len() == 2).await;

    // Newer request resolves first.
    pending.answer(1, Ok(json!([{ "id": "new" }])));
    next_event(&events, |e| matches!(e, CacheEvent::Applied { seq: 2, .. })).await;
    assert_eq!(sub.current().status, QueryStatus::Refetching);

    pending.answer(0, Ok(json!([{ "id": "old" }])));
    let event = next_event(&events, |e| matches!(e, CacheEvent::Discarded { .. })).await;
    assert!(matches!(
        event,
        CacheEvent::Discarded {
            seq: 1,
            reason: DiscardReason::OutOfOrder,
            ..
        }
    ));

    let state = sub.current();
    assert_eq!(state.status, QueryStatus::Ready);
    assert_eq!(ids(&state), ["new"]);
}

#[tokio::test]
async fn test_result_after_last_unsubscribe_is_discarded() {
    let (gateway, cache) = setup(CacheOptions::builder().with_eviction(EvictionPolicy::Never).build());
    let pending = Pending::register(&gateway, "items");
    let events = cache.events();

    let sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    let key = sub.key().clone();
    wait_until(|| pending.len() == 1).await;
    drop(sub);
    assert_eq!(cache.status(&key), Some(QueryStatus::Uninitialized));

    pending.answer(0, Ok(json!([{ "id": "late" }])));
    let event = next_event(&events, |e| matches!(e, CacheEvent::Discarded { .. })).await;
    assert!(matches!(
        event,
        CacheEvent::Discarded {
            reason: DiscardReason::Cancelled,
            ..
        }
    ));
    assert_eq!(cache.status(&key), Some(QueryStatus::Uninitialized));

    // A new subscriber starts over.
    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    wait_until(|| pending.len() == 2).await;
    pending.answer(1, Ok(json!([{ "id": "fresh" }])));
    assert_eq!(ids(&sub.settled().await.unwrap()), ["fresh"]);
}

#[tokio::test]
async fn test_late_result_from_evicted_entry_does_not_reach_recreated_entry() {
    let (gateway, cache) = setup(
        CacheOptions::builder()
            .with_eviction(EvictionPolicy::After(Duration::ZERO))
            .build(),
    );
    let pending = Pending::register(&gateway, "items");
    let events = cache.events();

    let sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    let key = sub.key().clone();
    wait_until(|| pending.len() == 1).await;
    drop(sub);
    assert!(!cache.contains(&key));

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    wait_until(|| pending.len() == 2).await;

    // The request issued before eviction answers first.
    pending.answer(0, Ok(json!([{ "id": "old" }])));
    let event = next_event(&events, |e| matches!(e, CacheEvent::Discarded { .. })).await;
    assert!(matches!(
        event,
        CacheEvent::Discarded {
            seq: 1,
            reason: DiscardReason::Evicted,
            ..
        }
    ));
    assert_eq!(sub.current().status, QueryStatus::Loading);

    pending.answer(1, Ok(json!([{ "id": "fresh" }])));
    let state = sub.settled().await.unwrap();
    assert_eq!(state.status, QueryStatus::Ready);
    assert_eq!(ids(&state), ["fresh"]);
}

#[test]
fn test_subscribe_outside_runtime_fails_without_leaking_entry() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!([])));

    let err = cache.subscribe(&ITEMS, project("p1")).unwrap_err();
    assert!(matches!(err, StateError::NoRuntime));
    insta::assert_snapshot!(err.to_string(), @"no tokio runtime to run the request on");
    assert!(cache.is_empty());
    assert_eq!(cache.tagged(Tag::Stacks), 0);
    assert_eq!(gateway.call_count("items"), 0);
}

#[test]
fn test_invalidate_outside_runtime_leaves_entry_stale() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!([{ "id": "a" }])));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let sub = runtime.block_on(async {
        let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
        sub.settled().await.unwrap();
        sub
    });

    assert_eq!(cache.invalidate(&[Tag::Stacks]), 0);
    assert!(!sub.refetch());
    let state = sub.current();
    assert_eq!(state.status, QueryStatus::Ready);
    assert!(state.stale);
    assert_eq!(gateway.call_count("items"), 1);
}

#[tokio::test]
async fn test_refetch_without_subscribers_is_refused() {
    let (gateway, cache) = setup(CacheOptions::builder().with_eviction(EvictionPolicy::Never).build());
    gateway.register_sync("items", |_| Ok(json!([])));

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();
    let key = sub.key().clone();
    drop(sub);

    assert!(!cache.refetch(&key));
    assert_eq!(gateway.call_count("items"), 1);
}

// =============================================================================
// Eviction
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_unused_entry_evicted_after_grace_period() {
    let grace = Duration::from_secs(30);
    let (gateway, cache) = setup(
        CacheOptions::builder()
            .with_eviction(EvictionPolicy::After(grace))
            .build(),
    );
    gateway.register_sync("items", |_| Ok(json!([])));

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();
    let key = sub.key().clone();
    drop(sub);

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(cache.contains(&key));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!cache.contains(&key));
    assert_eq!(cache.tagged(Tag::Stacks), 0);
}

#[tokio::test(start_paused = true)]
async fn test_resubscribe_within_grace_period_keeps_entry() {
    let (gateway, cache) = setup(
        CacheOptions::builder()
            .with_eviction(EvictionPolicy::After(Duration::from_secs(30)))
            .build(),
    );
    gateway.register_sync("items", |_| Ok(json!([])));

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();
    let key = sub.key().clone();
    drop(sub);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(cache.contains(&key));
    assert_eq!(sub.current().status, QueryStatus::Ready);
    assert_eq!(gateway.call_count("items"), 1);
}

#[tokio::test]
async fn test_zero_grace_period_evicts_immediately() {
    let (gateway, cache) = setup(
        CacheOptions::builder()
            .with_eviction(EvictionPolicy::After(Duration::ZERO))
            .build(),
    );
    gateway.register_sync("items", |_| Ok(json!([])));
    let events = cache.events();

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();
    let key = sub.key().clone();
    drop(sub);

    assert!(!cache.contains(&key));
    assert!(cache.is_empty());
    let event = next_event(&events, |e| matches!(e, CacheEvent::Evicted { .. })).await;
    assert_eq!(event, CacheEvent::Evicted { key });
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_shutdown_closes_subscriptions() {
    let (gateway, cache) = setup(CacheOptions::default());
    gateway.register_sync("items", |_| Ok(json!([])));

    let mut sub = cache.subscribe(&ITEMS, project("p1")).unwrap();
    sub.settled().await.unwrap();
    cache.shutdown();

    assert!(cache.is_closed());
    assert!(cache.is_empty());
    assert!(sub.changed().await.is_none());
    assert!(matches!(
        cache.subscribe(&ITEMS, project("p1")),
        Err(StateError::Shutdown)
    ));
    assert!(matches!(cache.ensure_open(), Err(StateError::Shutdown)));
}

// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde_json::json;

use super::{Binding, Bound};
use crate::entity::EntityAdapter;
use crate::error::GatewayError;
use crate::gateway::{MemoryGateway, params};
use crate::query::{CacheOptions, QueryCache, QueryDef, QueryStatus, Tag};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct Item {
    id: String,
    #[serde(default)]
    rev: u32,
}

fn item_id(item: &Item) -> String {
    item.id.clone()
}

const ITEMS: QueryDef<Item> = QueryDef::new("items", &[Tag::Stacks], EntityAdapter::new(item_id));

fn total(gateway: &Arc<MemoryGateway>) -> (QueryCache, Binding<Item, usize>) {
    let cache = QueryCache::new(gateway.clone(), CacheOptions::default());
    let sub = cache.subscribe(&ITEMS, params(json!({ "projectId": "p1" }))).unwrap();
    let binding = Binding::new(sub, |state| state.len());
    (cache, binding)
}

#[tokio::test]
async fn test_first_delivery_is_immediate() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.register_sync("items", |_| Ok(json!([{ "id": "a" }])));
    let (_cache, mut binding) = total(&gateway);

    let first = binding.next().await.unwrap();
    assert!(first.is_loading());
    assert_eq!(first.value, None);

    let ready = binding.next().await.unwrap();
    assert_eq!(
        ready,
        Bound {
            status: QueryStatus::Ready,
            value: Some(1),
            error: None,
        }
    );
}

#[tokio::test]
async fn test_identical_refetch_is_not_redelivered() {
    let gateway = Arc::new(MemoryGateway::new());
    let calls = AtomicUsize::new(0);
    gateway.register_sync("items", move |_| {
        // Content changes every call; the size only on the third.
        let rev = calls.fetch_add(1, Ordering::SeqCst);
        if rev < 2 {
            Ok(json!([{ "id": "a", "rev": rev }, { "id": "b", "rev": rev }]))
        } else {
            Ok(json!([{ "id": "a" }, { "id": "b" }, { "id": "c" }]))
        }
    });
    let (cache, mut binding) = total(&gateway);
    let mut probe = cache.subscribe(&ITEMS, params(json!({ "projectId": "p1" }))).unwrap();

    let ready = binding.settled().await.unwrap();
    assert_eq!(ready.value, Some(2));

    cache.invalidate(&[Tag::Stacks]);
    probe.settled().await.unwrap();
    cache.invalidate(&[Tag::Stacks]);

    let next = binding.next_value().await.unwrap();
    assert_eq!(next.value, Some(3));
    assert_eq!(gateway.call_count("items"), 3);
}

#[tokio::test]
async fn test_next_reports_status_transitions() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.register_sync("items", |_| Ok(json!([{ "id": "a" }])));
    let (cache, mut binding) = total(&gateway);

    binding.settled().await.unwrap();
    cache.invalidate(&[Tag::Stacks]);

    let refetching = binding.next().await.unwrap();
    assert_eq!(refetching.status, QueryStatus::Refetching);
    assert_eq!(refetching.value, Some(1));
    let ready = binding.next().await.unwrap();
    assert_eq!(ready.status, QueryStatus::Ready);
}

#[tokio::test]
async fn test_error_is_delivered_with_last_value() {
    let gateway = Arc::new(MemoryGateway::new());
    let calls = AtomicUsize::new(0);
    gateway.register_sync("items", move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(json!([{ "id": "a" }]))
        } else {
            Err(GatewayError::Unreachable {
                command: "items".into(),
                message: "connection refused".into(),
            })
        }
    });
    let (cache, mut binding) = total(&gateway);

    binding.settled().await.unwrap();
    cache.invalidate(&[Tag::Stacks]);

    let failed = binding.next_value().await.unwrap();
    assert!(failed.is_error());
    assert_eq!(failed.status, QueryStatus::Errored);
    assert_eq!(failed.value, Some(1));
}

#[tokio::test]
async fn test_binding_ends_on_shutdown() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.register_sync("items", |_| Ok(json!([])));
    let (cache, mut binding) = total(&gateway);

    binding.settled().await.unwrap();
    cache.shutdown();

    assert_eq!(binding.next().await, None);
}

#[test]
fn test_bound_map_keeps_status() {
    let bound = Bound {
        status: QueryStatus::Refetching,
        value: Some(2),
        error: None,
    };

    assert_eq!(
        bound.map(|n| n * 10),
        Bound {
            status: QueryStatus::Refetching,
            value: Some(20),
            error: None,
        }
    );
}

#[tokio::test]
async fn test_debug_shows_key_and_last_delivery() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.register_sync("items", |_| Ok(json!([{ "id": "a" }])));
    let (_cache, mut binding) = total(&gateway);

    let before = format!("{binding:?}");
    assert!(before.starts_with("Binding {"));
    assert!(before.contains("items"));
    assert!(before.contains("last: None"));

    binding.settled().await.unwrap();
    assert!(format!("{binding:?}").contains("value: Some(1)"));
}

//! Session revalidation tests against an in-memory store.
//!
//! Covers the per-request state machine: lookup, not found, expiry, refresh,
//! and how store failures surface.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{at, config_5s, MemoryStore};
use warden::{AnonymousReason, SessionRevalidator, SessionUser, StoreError};

fn revalidator(store: &Arc<MemoryStore>) -> SessionRevalidator<MemoryStore> {
    SessionRevalidator::new(Arc::clone(store), &config_5s([]))
}

/// Idle for 10s with a 5s timeout resolves anonymous without an error.
#[tokio::test]
async fn test_stale_session_resolves_anonymous() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", Some(at(-10)));

    let user = revalidator(&store).revalidate_at(id, at(0)).await.unwrap();

    assert!(matches!(user, SessionUser::Anonymous(AnonymousReason::Expired)));
    assert_eq!(store.update_calls(), 0);
    assert_eq!(store.get(id).unwrap().last_request_at, Some(at(-10)));
}

/// Idle for 1s with a 5s timeout resolves to the identity and refreshes it.
#[tokio::test]
async fn test_fresh_session_refreshes() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", Some(at(-1)));

    let identity = revalidator(&store)
        .deserialize_at(id, at(0))
        .await
        .unwrap()
        .expect("fresh session should resolve");

    assert_eq!(identity.id, id);
    assert_eq!(identity.last_request_at, Some(at(0)));
    assert_eq!(store.update_calls(), 1);
    assert_eq!(store.get(id).unwrap().last_request_at, Some(at(0)));
}

/// A missing lookup resolves anonymous and never writes.
#[tokio::test]
async fn test_missing_identity_no_write() {
    let store = Arc::new(MemoryStore::new());

    let user = revalidator(&store).revalidate_at(77, at(0)).await.unwrap();

    assert!(matches!(user, SessionUser::Anonymous(AnonymousReason::NotFound)));
    assert_eq!(store.find_calls(), 1);
    assert_eq!(store.update_calls(), 0);
}

/// Lookup failures propagate as store errors.
#[tokio::test]
async fn test_lookup_failure_propagates() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", None);
    store.fail_find(true);

    let result = revalidator(&store).deserialize_at(id, at(0)).await;

    assert!(matches!(result, Err(StoreError::Database(_))));
    assert_eq!(store.update_calls(), 0);
}

/// Refresh failures propagate as store errors.
#[tokio::test]
async fn test_refresh_failure_propagates() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", Some(at(-1)));
    store.fail_update(true);

    let result = revalidator(&store).revalidate_at(id, at(0)).await;

    assert!(matches!(result, Err(StoreError::Database(_))));
    assert_eq!(store.update_calls(), 1);
}

/// Missing last_request_at is the first request after login and never stale.
#[tokio::test]
async fn test_first_request_never_stale() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", None);

    let user = revalidator(&store)
        .revalidate_at(id, at(1_000_000))
        .await
        .unwrap();

    assert!(user.is_authenticated());
    assert_eq!(store.get(id).unwrap().last_request_at, Some(at(1_000_000)));
}

/// Each request goes back to the store; nothing is cached between requests.
#[tokio::test]
async fn test_no_cross_request_cache() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", None);
    let revalidator = revalidator(&store);

    assert!(revalidator.deserialize_at(id, at(0)).await.unwrap().is_some());
    store.remove(id);
    assert!(revalidator.deserialize_at(id, at(1)).await.unwrap().is_none());
    assert_eq!(store.find_calls(), 2);
}

/// Sliding window: each refresh pushes expiry forward.
#[tokio::test]
async fn test_sliding_expiry() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", Some(at(0)));
    let revalidator = revalidator(&store);

    for step in 1..=5 {
        let now = at(step * 4);
        assert!(revalidator.deserialize_at(id, now).await.unwrap().is_some());
    }
    assert!(revalidator.deserialize_at(id, at(26)).await.unwrap().is_none());
}

/// An identity deleted between lookup and refresh resolves anonymous.
#[tokio::test]
async fn test_identity_vanishes_before_refresh() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", None);
    let gate = store.gate_updates();

    let task = {
        let revalidator = revalidator(&store);
        tokio::spawn(async move { revalidator.revalidate_at(id, at(0)).await })
    };

    while store.update_calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    store.remove(id);
    gate.notify_one();

    let user = task.await.unwrap().unwrap();
    assert!(matches!(user, SessionUser::Anonymous(AnonymousReason::Vanished)));
}

/// A request dropped mid-refresh still lets the write land.
#[tokio::test]
async fn test_dropped_request_completes_write() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", Some(at(-1)));
    let gate = store.gate_updates();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        revalidator(&store).revalidate_at(id, at(0)),
    )
    .await;
    assert!(abandoned.is_err(), "request should still be waiting on the write");

    gate.notify_one();

    for _ in 0..100 {
        if store.get(id).unwrap().last_request_at == Some(at(0)) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(store.get(id).unwrap().last_request_at, Some(at(0)));
}

/// A slow lookup for one identity does not hold up another.
#[tokio::test]
async fn test_no_head_of_line_blocking() {
    let store = Arc::new(MemoryStore::new());
    let slow = store.insert("slow@example.com", None);
    let fast = store.insert("fast@example.com", None);
    let gate = store.gate_find(slow);

    let slow_task = {
        let revalidator = revalidator(&store);
        tokio::spawn(async move { revalidator.deserialize_at(slow, at(0)).await })
    };

    let fast_result = tokio::time::timeout(
        Duration::from_secs(1),
        revalidator(&store).deserialize_at(fast, at(0)),
    )
    .await
    .expect("fast lookup should not wait on slow one")
    .unwrap();
    assert_eq!(fast_result.unwrap().id, fast);

    gate.notify_one();
    let slow_result = slow_task.await.unwrap().unwrap();
    assert_eq!(slow_result.unwrap().id, slow);
}

/// Concurrent refreshes of the same session both succeed; last write wins.
#[tokio::test]
async fn test_concurrent_refresh_same_identity() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", Some(at(0)));
    let revalidator = revalidator(&store);

    let (a, b) = tokio::join!(
        revalidator.deserialize_at(id, at(1)),
        revalidator.deserialize_at(id, at(2)),
    );

    assert!(a.unwrap().is_some());
    assert!(b.unwrap().is_some());
    assert_eq!(store.update_calls(), 2);
    let last = store.get(id).unwrap().last_request_at.unwrap();
    assert!(last == at(1) || last == at(2));
}

/// The session holds only the identity ID.
#[tokio::test]
async fn test_serialize_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert("henry@example.com", None);
    let identity = store.get(id).unwrap();

    let revalidator = revalidator(&store);
    let session_value = revalidator.serialize(&identity);
    assert_eq!(session_value, id);

    let restored = revalidator
        .deserialize_at(session_value, at(0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.email, "henry@example.com");
}

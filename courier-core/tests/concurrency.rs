//! Concurrency tests for sessions
//!
//! These tests validate the single-drainer guarantee and isolation:
//! - A second drain call while one is running does nothing
//! - Enqueues racing from many tasks keep per-producer order
//! - Slow sessions never hold up other sessions
//! - Events from a replaced link are ignored

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use courier_core::{
    CloseReason, MemoryCredentialStore, MockConnectionFactory, SessionConfig, SessionState,
};

#[tokio::test]
async fn drain_is_not_reentrant() {
    let h = harness_with(
        fast_config(),
        MockConnectionFactory::new().with_send_delay(Duration::from_millis(50)),
        Arc::new(MemoryCredentialStore::new()),
        "slow",
    )
    .await;
    let link = h.factory.last_link().unwrap();
    link.open().await;
    wait_for_state(&h.session, SessionState::Connected).await;

    h.session.enqueue("1", "a").unwrap();
    h.session.enqueue("2", "b").unwrap();
    wait_until("draining", || h.session.is_draining()).await;

    assert_eq!(h.session.drain().await, 0);

    wait_until("both sent", || h.session.messages_sent() == 2).await;
    assert_eq!(h.factory.attempts().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_producers_keep_their_own_order() {
    let (h, _link) = connected(fast_config()).await;
    let session = Arc::clone(&h.session);

    let mut handles = vec![];
    for producer in 0..4u32 {
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            for seq in 0..25u32 {
                session
                    .enqueue(&format!("{}{:03}", producer + 1, seq), "x")
                    .unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    wait_until("all sent", || session.messages_sent() == 100).await;
    assert_eq!(session.queue_len(), 0);

    let delivered = h.factory.delivered();
    assert_eq!(delivered.len(), 100);
    for producer in 1..=4u32 {
        let prefix = producer.to_string();
        let sequence: Vec<_> = delivered
            .iter()
            .filter(|d| d.starts_with(&prefix))
            .cloned()
            .collect();
        let mut sorted = sequence.clone();
        sorted.sort();
        assert_eq!(sequence, sorted, "producer {} out of order", producer);
    }
}

#[tokio::test]
async fn slow_session_does_not_block_another() {
    let slow = harness_with(
        fast_config(),
        MockConnectionFactory::new().with_send_delay(Duration::from_millis(200)),
        Arc::new(MemoryCredentialStore::new()),
        "slow",
    )
    .await;
    let fast = harness_with(
        fast_config(),
        MockConnectionFactory::new(),
        Arc::new(MemoryCredentialStore::new()),
        "fast",
    )
    .await;
    for h in [&slow, &fast] {
        h.factory.last_link().unwrap().open().await;
        wait_for_state(&h.session, SessionState::Connected).await;
    }

    for n in ["1", "2", "3"] {
        slow.session.enqueue(n, "x").unwrap();
        fast.session.enqueue(n, "x").unwrap();
    }

    wait_until("fast session done", || fast.session.messages_sent() == 3).await;
    assert!(slow.session.messages_sent() < 3);
}

#[tokio::test]
async fn events_from_replaced_link_are_ignored() {
    let (h, first) = connected(fast_config()).await;

    first.close_with(CloseReason::transient("reset")).await;
    let second = wait_for_link(&h.factory, 2).await;
    second.open().await;
    wait_for_state(&h.session, SessionState::Connected).await;

    first.close_with(CloseReason::transient("late")).await;
    first.pairing_challenge("stale").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.session.state(), SessionState::Connected);
    assert_eq!(h.session.pairing_code(), None);
    assert_eq!(h.factory.connect_count(), 2);
}

#[tokio::test]
async fn disconnect_discards_pending_messages() {
    let config = SessionConfig {
        pacing_interval_ms: 500,
        ..fast_config()
    };
    let (h, link) = connected(config).await;
    for n in ["1", "2", "3"] {
        h.session.enqueue(n, "x").unwrap();
    }
    wait_until("first send", || h.session.messages_sent() == 1).await;

    h.session.disconnect(false).await;

    assert_eq!(h.session.queue_len(), 0);
    assert!(link.connection().is_closed());
    assert!(h.session.enqueue("4", "x").is_err());
}

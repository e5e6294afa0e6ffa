//! Tests for SubscriptionBroadcaster
//!
//! These tests verify:
//! - Every registered subscriber receives each notification, in order
//! - A subscriber whose delivery fails is dropped
//! - A subscriber that stops accepting writes never delays the others
//! - Duplicate registration and unknown removal are no-ops

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use corpkv::broadcast::{Subscriber, SubscriptionBroadcaster};
use corpkv::model::Item;
use crossbeam::channel::{self, Receiver, Sender};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

/// Forwards delivered messages to a channel
struct ChannelSubscriber {
    tx: Sender<Vec<u8>>,
}

impl Subscriber for ChannelSubscriber {
    fn deliver(&self, message: &[u8]) -> io::Result<()> {
        self.tx
            .send(message.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "receiver gone"))
    }
}

/// Always fails, counting attempts
struct BrokenSubscriber {
    attempts: Arc<AtomicUsize>,
}

impl Subscriber for BrokenSubscriber {
    fn deliver(&self, _message: &[u8]) -> io::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"))
    }
}

/// Blocks in `deliver` until the gate sender is dropped, then fails
struct StalledSubscriber {
    gate: Receiver<()>,
    closed: Arc<AtomicUsize>,
}

impl Subscriber for StalledSubscriber {
    fn deliver(&self, _message: &[u8]) -> io::Result<()> {
        let _ = self.gate.recv();
        Err(io::Error::new(io::ErrorKind::TimedOut, "peer stopped reading"))
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn channel_subscriber() -> (Arc<dyn Subscriber>, Receiver<Vec<u8>>) {
    let (tx, rx) = channel::unbounded();
    (Arc::new(ChannelSubscriber { tx }), rx)
}

fn item(id: &str) -> Item {
    Item::from_json(&json!({"id": id, "price": 1.5})).unwrap()
}

fn receive(rx: &Receiver<Vec<u8>>) -> Value {
    let bytes = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_subscribe_and_unsubscribe() {
    let broadcaster = SubscriptionBroadcaster::new();
    let (sub, _rx) = channel_subscriber();

    assert!(broadcaster.subscribe(1, sub, "client").unwrap());
    assert!(broadcaster.is_subscribed(1));
    assert_eq!(broadcaster.subscriber_count(), 1);

    assert!(broadcaster.unsubscribe(1));
    assert!(!broadcaster.unsubscribe(1));
    assert_eq!(broadcaster.subscriber_count(), 0);
}

#[test]
fn test_duplicate_subscribe_is_noop() {
    let broadcaster = SubscriptionBroadcaster::new();
    let (first, first_rx) = channel_subscriber();
    let (second, second_rx) = channel_subscriber();

    assert!(broadcaster.subscribe(7, first, "client").unwrap());
    assert!(!broadcaster.subscribe(7, second, "client").unwrap());
    assert_eq!(broadcaster.subscriber_count(), 1);

    broadcaster.notify(&item("A"));
    receive(&first_rx);
    assert!(second_rx.recv_timeout(Duration::from_millis(100)).is_err());
}

// =============================================================================
// Notification Tests
// =============================================================================

#[test]
fn test_notify_without_subscribers() {
    let broadcaster = SubscriptionBroadcaster::new();
    assert_eq!(broadcaster.notify(&item("A")), 0);
}

#[test]
fn test_notification_format() {
    let broadcaster = SubscriptionBroadcaster::new();
    let (sub, rx) = channel_subscriber();
    broadcaster.subscribe(1, sub, "client").unwrap();

    assert_eq!(broadcaster.notify(&item("A")), 1);
    assert_eq!(
        receive(&rx),
        json!({"EVENT": "update", "DATA": {"id": "A", "price": "1.5"}})
    );
}

#[test]
fn test_all_subscribers_receive_in_order() {
    let broadcaster = SubscriptionBroadcaster::new();
    let receivers: Vec<_> = (1..=3)
        .map(|id| {
            let (sub, rx) = channel_subscriber();
            broadcaster.subscribe(id, sub, "client").unwrap();
            rx
        })
        .collect();

    for id in ["first", "second", "third"] {
        assert_eq!(broadcaster.notify(&item(id)), 3);
    }

    for rx in &receivers {
        let ids: Vec<Value> = (0..3).map(|_| receive(rx)["DATA"]["id"].clone()).collect();
        assert_eq!(ids, vec![json!("first"), json!("second"), json!("third")]);
    }
}

#[test]
fn test_failed_subscriber_removed() {
    let broadcaster = SubscriptionBroadcaster::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let (healthy, rx) = channel_subscriber();

    broadcaster.subscribe(
        1,
        Arc::new(BrokenSubscriber {
            attempts: Arc::clone(&attempts),
        }),
        "broken",
    )
    .unwrap();
    broadcaster.subscribe(2, healthy, "healthy").unwrap();

    broadcaster.notify(&item("A"));
    receive(&rx);
    assert!(wait_for(|| !broadcaster.is_subscribed(1)));
    assert!(broadcaster.is_subscribed(2));

    // Later notifications skip the dropped subscriber
    assert_eq!(broadcaster.notify(&item("B")), 1);
    receive(&rx);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_late_subscriber_misses_earlier_notifications() {
    let broadcaster = SubscriptionBroadcaster::new();
    let (early, early_rx) = channel_subscriber();
    broadcaster.subscribe(1, early, "early").unwrap();

    broadcaster.notify(&item("before"));
    receive(&early_rx);

    let (late, late_rx) = channel_subscriber();
    broadcaster.subscribe(2, late, "late").unwrap();
    broadcaster.notify(&item("after"));

    assert_eq!(receive(&late_rx)["DATA"]["id"], json!("after"));
    assert_eq!(receive(&early_rx)["DATA"]["id"], json!("after"));
}

// =============================================================================
// Stalled Subscriber Tests
// =============================================================================

#[test]
fn test_stalled_subscriber_does_not_block_others() {
    let broadcaster = SubscriptionBroadcaster::new();
    let (gate_tx, gate) = channel::bounded::<()>(0);
    let closed = Arc::new(AtomicUsize::new(0));
    let (healthy, rx) = channel_subscriber();

    broadcaster
        .subscribe(1, Arc::new(StalledSubscriber { gate, closed: Arc::clone(&closed) }), "stalled")
        .unwrap();
    broadcaster.subscribe(2, healthy, "healthy").unwrap();

    let ids: Vec<String> = (0..50).map(|i| format!("N{}", i)).collect();
    for id in &ids {
        broadcaster.notify(&item(id));
    }

    for id in &ids {
        assert_eq!(receive(&rx)["DATA"]["id"], json!(id));
    }

    drop(gate_tx);
    assert!(wait_for(|| !broadcaster.is_subscribed(1)));
    assert!(broadcaster.is_subscribed(2));
}

#[test]
fn test_overflowing_subscriber_dropped() {
    let broadcaster = SubscriptionBroadcaster::with_queue_capacity(4);
    let (_gate_tx, gate) = channel::bounded::<()>(0);
    let closed = Arc::new(AtomicUsize::new(0));
    let (healthy, rx) = channel_subscriber();

    broadcaster
        .subscribe(1, Arc::new(StalledSubscriber { gate, closed: Arc::clone(&closed) }), "stalled")
        .unwrap();
    broadcaster.subscribe(2, healthy, "healthy").unwrap();

    for i in 0..20 {
        broadcaster.notify(&item(&format!("N{}", i)));
        // Keep the healthy queue drained
        receive(&rx);
    }

    assert!(!broadcaster.is_subscribed(1));
    assert!(broadcaster.is_subscribed(2));
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

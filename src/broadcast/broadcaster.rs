//! Subscription Broadcaster
//!
//! Holds the subscriber set and fans notifications out to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::Result;
use crate::model::Item;
use crate::protocol::encode_notification;
use super::Subscriber;

/// Server-assigned id of an accepted connection
pub type ConnectionId = u64;

/// Notifications buffered per subscriber before it is considered stalled
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

struct Registration {
    client_id: String,
    subscriber: Arc<dyn Subscriber>,

    /// Feeds this subscriber's writer thread
    queue: Sender<Bytes>,
}

type Registry = Arc<Mutex<HashMap<ConnectionId, Registration>>>;

/// Registry of subscribed connections
///
/// ## Delivery:
/// - Every subscriber has its own bounded queue and writer thread, so a
///   peer that stops reading only ever stalls itself
/// - A full queue or a failed write drops that subscriber
/// - Queues are filled under the registry lock, so all subscribers see
///   notifications in the same order
pub struct SubscriptionBroadcaster {
    subscribers: Registry,
    queue_capacity: usize,
}

impl Default for SubscriptionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionBroadcaster {
    /// Create an empty broadcaster with the default queue capacity
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create an empty broadcaster buffering up to `capacity` notifications
    /// per subscriber
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            queue_capacity: capacity.max(1),
        }
    }

    /// Register a connection and start its writer thread.
    ///
    /// Returns `Ok(false)` (and changes nothing) if it is already registered.
    pub fn subscribe(
        &self,
        id: ConnectionId,
        subscriber: Arc<dyn Subscriber>,
        client_id: &str,
    ) -> Result<bool> {
        let mut subscribers = self.subscribers.lock();
        if subscribers.contains_key(&id) {
            tracing::warn!(
                "Connection {} (client {}) is already subscribed",
                id,
                client_id
            );
            return Ok(false);
        }

        let (queue, pending) = channel::bounded(self.queue_capacity);
        let registry = Arc::clone(&self.subscribers);
        let writer = Arc::clone(&subscriber);
        thread::Builder::new()
            .name(format!("subscriber-{}", id))
            .spawn(move || run_writer(id, pending, writer, registry))?;

        subscribers.insert(
            id,
            Registration {
                client_id: client_id.to_string(),
                subscriber,
                queue,
            },
        );
        tracing::info!(
            "New subscriber {} (client {}). Total: {}",
            id,
            client_id,
            subscribers.len()
        );
        Ok(true)
    }

    /// Remove a connection. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        match subscribers.remove(&id) {
            Some(registration) => {
                tracing::info!(
                    "Subscriber {} (client {}) removed. Total: {}",
                    id,
                    registration.client_id,
                    subscribers.len()
                );
                true
            }
            None => false,
        }
    }

    /// Announce a stored item to every current subscriber.
    ///
    /// Never waits for delivery. Returns the number of subscribers the
    /// notification was queued for.
    pub fn notify(&self, item: &Item) -> usize {
        let message = match encode_notification(item) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("Cannot encode notification: {}", e);
                return 0;
            }
        };

        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return 0;
        }

        let mut queued = 0;
        let mut dropped = Vec::new();
        for (id, registration) in subscribers.iter() {
            match registration.queue.try_send(message.clone()) {
                Ok(()) => queued += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Subscriber {} (client {}) is not keeping up, removing it",
                        id,
                        registration.client_id
                    );
                    dropped.push(*id);
                }
                Err(TrySendError::Disconnected(_)) => dropped.push(*id),
            }
        }

        for id in dropped {
            if let Some(registration) = subscribers.remove(&id) {
                registration.subscriber.close();
                tracing::info!("Subscriber {} dropped. Total: {}", id, subscribers.len());
            }
        }

        tracing::info!("Notified {} subscriber(s)", queued);
        queued
    }

    /// Number of registered connections
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_subscribed(&self, id: ConnectionId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }
}

/// Write queued notifications to one subscriber until its queue closes or a
/// write fails
fn run_writer(
    id: ConnectionId,
    pending: Receiver<Bytes>,
    subscriber: Arc<dyn Subscriber>,
    subscribers: Registry,
) {
    for message in pending {
        if let Err(e) = subscriber.deliver(&message) {
            tracing::warn!("Delivery to subscriber {} failed ({}), removing it", id, e);
            let mut registry = subscribers.lock();
            if registry.remove(&id).is_some() {
                tracing::info!("Subscriber {} dropped. Total: {}", id, registry.len());
            }
            drop(registry);
            subscriber.close();
            break;
        }
    }
    tracing::debug!("Writer for subscriber {} stopped", id);
}

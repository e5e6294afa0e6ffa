//! Broadcast Module
//!
//! Pushes data-change notifications to subscribed connections.
//!
//! ## Architecture
//! - One lock guards the subscriber set
//! - `notify` queues the message for every subscriber and returns; the
//!   caller never waits for delivery
//! - One writer thread per subscriber drains its queue in order, so a stalled
//!   peer never delays anyone else
//! - A failed write or an overflowing queue removes that subscriber

mod subscriber;
mod broadcaster;

pub use subscriber::{Subscriber, SubscriberStream};
pub use broadcaster::{ConnectionId, SubscriptionBroadcaster, DEFAULT_QUEUE_CAPACITY};

//! Upstream message-bus abstraction
//!
//! The dispatcher never talks to a concrete bus directly. It goes through
//! [`BusClient`], an object-safe async trait modeled on the usual pub/sub
//! client surface: subscribe with callbacks, publish raw bytes, unsubscribe.
//!
//! A [`BusReceiver`] is the callback pair handed to `subscribe`. The bus calls
//! `message` for every payload delivered on the topic and `unsubscribed` once
//! when the subscription ends, whether by an explicit `unsubscribe` call or
//! because the underlying connection dropped. Both callbacks must be invoked
//! from within a tokio runtime context.

pub mod memory;

pub use memory::MemoryBus;

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for bus operations
#[derive(Debug, Clone)]
pub enum BusError {
    /// Establishing a subscription failed
    Subscribe(String),
    /// Publishing a payload failed
    Publish(String),
    /// Tearing down a subscription failed
    Unsubscribe(String),
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::Subscribe(msg) => write!(f, "bus subscribe failed: {}", msg),
            BusError::Publish(msg) => write!(f, "bus publish failed: {}", msg),
            BusError::Unsubscribe(msg) => write!(f, "bus unsubscribe failed: {}", msg),
        }
    }
}

impl std::error::Error for BusError {}

/// Callback pair registered with the bus for one topic subscription.
///
/// `message` may fire any number of times; `unsubscribed` fires when the
/// subscription ends. The receiver side tolerates `unsubscribed` firing more
/// than once (close is idempotent downstream).
pub struct BusReceiver {
    on_message: Box<dyn Fn(Bytes) + Send + Sync>,
    on_unsubscribe: Box<dyn Fn() + Send + Sync>,
}

impl BusReceiver {
    /// Create a receiver from a message callback and an unsubscribe callback
    pub fn new(
        on_message: impl Fn(Bytes) + Send + Sync + 'static,
        on_unsubscribe: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_message: Box::new(on_message),
            on_unsubscribe: Box::new(on_unsubscribe),
        }
    }

    /// Deliver one payload received on the subscribed topic
    pub fn message(&self, payload: Bytes) {
        (self.on_message)(payload);
    }

    /// Signal that the subscription has ended
    pub fn unsubscribed(&self) {
        (self.on_unsubscribe)();
    }
}

impl std::fmt::Debug for BusReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusReceiver").finish_non_exhaustive()
    }
}

/// Client contract for the upstream message bus
///
/// One subscription per topic is what the dispatcher maintains; the bus itself
/// may serve any number of independent subscribers (other connections, other
/// processes).
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Subscribe to a topic, routing deliveries into `receiver`
    async fn subscribe(&self, topic: &str, receiver: BusReceiver) -> Result<(), BusError>;

    /// Publish a payload to a topic
    ///
    /// Returns the number of bus-level subscribers the payload was delivered to.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<usize, BusError>;

    /// Unsubscribe from a topic
    ///
    /// Fires the `unsubscribed` callback of every receiver registered for the
    /// topic on this client.
    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError>;
}

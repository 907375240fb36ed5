//! In-process bus implementation
//!
//! A complete [`BusClient`] backed by a mutex-guarded map of topic to
//! registered receivers. Useful on its own for single-process deployments and
//! as the bus under test elsewhere in the crate. Publishing fans out to every
//! receiver registered for the topic, mirroring how a networked bus delivers
//! one copy per subscribed connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use super::{BusClient, BusError, BusReceiver};

/// In-memory message bus
#[derive(Debug, Default)]
pub struct MemoryBus {
    topics: Mutex<HashMap<String, Vec<Arc<BusReceiver>>>>,
}

impl MemoryBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of receivers currently registered for a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .expect("bus lock poisoned")
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Snapshot the receivers for a topic without holding the lock during
    /// callback invocation.
    fn receivers(&self, topic: &str) -> Vec<Arc<BusReceiver>> {
        self.topics
            .lock()
            .expect("bus lock poisoned")
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl BusClient for MemoryBus {
    async fn subscribe(&self, topic: &str, receiver: BusReceiver) -> Result<(), BusError> {
        let mut topics = self.topics.lock().expect("bus lock poisoned");
        topics
            .entry(topic.to_string())
            .or_default()
            .push(Arc::new(receiver));
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<usize, BusError> {
        let receivers = self.receivers(topic);
        for receiver in &receivers {
            receiver.message(payload.clone());
        }
        Ok(receivers.len())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
        let removed = {
            let mut topics = self.topics.lock().expect("bus lock poisoned");
            topics.remove(topic).unwrap_or_default()
        };
        for receiver in &removed {
            receiver.unsubscribed();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting_receiver(
        messages: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    ) -> BusReceiver {
        BusReceiver::new(
            move |_| {
                messages.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                closes.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_every_receiver() {
        let bus = MemoryBus::new();
        let messages = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            bus.subscribe("room:1", counting_receiver(messages.clone(), closes.clone()))
                .await
                .unwrap();
        }

        let delivered = bus
            .publish("room:1", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(delivered, 3);
        assert_eq!(messages.load(Ordering::SeqCst), 3);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_empty_fanout() {
        let bus = MemoryBus::new();
        let delivered = bus
            .publish("nobody", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_fires_callbacks_and_clears_topic() {
        let bus = MemoryBus::new();
        let messages = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));

        bus.subscribe("room:1", counting_receiver(messages.clone(), closes.clone()))
            .await
            .unwrap();
        bus.subscribe("room:1", counting_receiver(messages.clone(), closes.clone()))
            .await
            .unwrap();
        assert_eq!(bus.subscriber_count("room:1"), 2);

        bus.unsubscribe("room:1").await.unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 2);
        assert_eq!(bus.subscriber_count("room:1"), 0);

        // Publishing afterwards reaches nobody.
        let delivered = bus
            .publish("room:1", Bytes::from_static(b"late"))
            .await
            .unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(messages.load(Ordering::SeqCst), 0);
    }
}

//! Typed pub/sub facade
//!
//! A thin JSON codec layer over the [`Dispatcher`](crate::registry::Dispatcher):
//! values go out encoded with `serde_json`, and each consumer gets a
//! [`TypedStream`] that decodes its own copy of every payload. Decode failures
//! are scoped to the one consumer that hit them; whether its stream survives
//! the failure is a [`DecodePolicy`] choice.

pub mod error;
pub mod stream;

pub use error::{DecodeError, PublishError};
pub use stream::TypedStream;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bus::BusClient;
use crate::registry::{Dispatcher, SubscribeError};

/// What a typed stream does after a payload fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Yield the decode error, then keep the stream alive for later payloads
    Skip,
    /// Yield the decode error as the stream's final item, then end it
    Stop,
}

/// Typed pub/sub over an injected bus client
///
/// Cheap to clone; all clones share one dispatcher. Every `stream` call is an
/// independent consumer: late subscribers see only payloads published after
/// they attached, and each stream ends when its topic is closed.
#[derive(Debug, Clone)]
pub struct PubSub {
    dispatcher: Dispatcher,
    policy: DecodePolicy,
}

impl PubSub {
    /// Create a pub/sub facade that skips past undecodable payloads
    pub fn new(bus: Arc<dyn BusClient>) -> Self {
        Self::with_policy(bus, DecodePolicy::Skip)
    }

    /// Create a pub/sub facade with an explicit decode policy
    pub fn with_policy(bus: Arc<dyn BusClient>, policy: DecodePolicy) -> Self {
        Self {
            dispatcher: Dispatcher::new(bus),
            policy,
        }
    }

    /// Open a typed consumer stream on a topic
    pub async fn stream<T: DeserializeOwned>(
        &self,
        topic: &str,
    ) -> Result<TypedStream<T>, SubscribeError> {
        let handle = self.dispatcher.open_stream(topic).await?;
        Ok(TypedStream::new(handle, self.policy))
    }

    /// Encode a value and publish it to a topic
    ///
    /// Returns the bus-reported delivery count. On encode failure no bus call
    /// is made and no consumer is affected.
    pub async fn publish<T: Serialize>(
        &self,
        topic: &str,
        value: &T,
    ) -> Result<usize, PublishError> {
        let payload = serde_json::to_vec(value).map_err(PublishError::Encode)?;
        self.dispatcher
            .publish(topic, payload.into())
            .await
            .map_err(PublishError::Bus)
    }

    /// Close a topic, ending every typed stream attached to it
    pub async fn close(&self, topic: &str) {
        self.dispatcher.close_topic(topic).await;
    }

    /// The raw-bytes dispatcher underneath this facade
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde::ser::Error as _;

    use crate::bus::MemoryBus;

    use super::*;

    fn pubsub(policy: DecodePolicy) -> (Arc<MemoryBus>, PubSub) {
        let bus = Arc::new(MemoryBus::new());
        let pubsub = PubSub::with_policy(Arc::clone(&bus) as Arc<dyn BusClient>, policy);
        (bus, pubsub)
    }

    #[tokio::test]
    async fn test_two_streams_decode_the_same_value() {
        let (_bus, pubsub) = pubsub(DecodePolicy::Skip);

        let mut a = pubsub.stream::<i64>("room:1").await.unwrap();
        let mut b = pubsub.stream::<i64>("room:1").await.unwrap();

        pubsub.publish("room:1", &42i64).await.unwrap();

        assert_eq!(a.next().await.unwrap().unwrap(), 42);
        assert_eq!(b.next().await.unwrap().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_skip_policy_continues_past_bad_payload() {
        let (_bus, pubsub) = pubsub(DecodePolicy::Skip);

        let mut a = pubsub.stream::<i64>("room:1").await.unwrap();
        let mut b = pubsub.stream::<i64>("room:1").await.unwrap();

        pubsub.publish("room:1", &"not-an-int").await.unwrap();
        pubsub.publish("room:1", &0i64).await.unwrap();

        for stream in [&mut a, &mut b] {
            let bad = stream.next().await.unwrap().unwrap_err();
            assert_eq!(bad.topic(), "room:1");
            assert_eq!(stream.next().await.unwrap().unwrap(), 0);
        }

        pubsub.close("room:1").await;
        assert!(a.next().await.is_none());
        assert!(b.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_policy_ends_stream_on_bad_payload() {
        let (bus, pubsub) = pubsub(DecodePolicy::Stop);

        let mut doomed = pubsub.stream::<i64>("room:1").await.unwrap();

        pubsub.publish("room:1", &"not-an-int").await.unwrap();
        pubsub.publish("room:1", &7i64).await.unwrap();

        assert!(doomed.next().await.unwrap().is_err());
        assert!(doomed.next().await.is_none());

        // Ending one stream detached only that consumer; the topic stays open.
        assert_eq!(bus.subscriber_count("room:1"), 1);
        assert_eq!(pubsub.dispatcher().consumer_count("room:1").await, 0);

        let mut fresh = pubsub.stream::<i64>("room:1").await.unwrap();
        pubsub.publish("room:1", &8i64).await.unwrap();
        assert_eq!(fresh.next().await.unwrap().unwrap(), 8);
    }

    #[tokio::test]
    async fn test_decode_failure_isolated_to_one_type() {
        let (_bus, pubsub) = pubsub(DecodePolicy::Skip);

        // Same topic, different expected types: the string decodes for one
        // consumer and fails for the other.
        let mut ints = pubsub.stream::<i64>("room:1").await.unwrap();
        let mut strings = pubsub.stream::<String>("room:1").await.unwrap();

        pubsub.publish("room:1", &"hello").await.unwrap();

        assert!(ints.next().await.unwrap().is_err());
        assert_eq!(strings.next().await.unwrap().unwrap(), "hello");

        pubsub.publish("room:1", &5i64).await.unwrap();
        assert_eq!(ints.next().await.unwrap().unwrap(), 5);
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refuses to serialize"))
        }
    }

    #[tokio::test]
    async fn test_encode_failure_makes_no_bus_call() {
        let (_bus, pubsub) = pubsub(DecodePolicy::Skip);

        let mut a = pubsub.stream::<i64>("room:1").await.unwrap();

        let err = pubsub.publish("room:1", &Unencodable).await.unwrap_err();
        assert!(matches!(err, PublishError::Encode(_)));

        // The consumer saw nothing; a valid publish still goes through.
        pubsub.publish("room:1", &1i64).await.unwrap();
        assert_eq!(a.next().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_is_ok() {
        let (_bus, pubsub) = pubsub(DecodePolicy::Skip);

        let delivered = pubsub.publish("empty", &1i64).await.unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_struct_payload_roundtrip() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct RoomEvent {
            room: String,
            seq: u64,
        }

        let (_bus, pubsub) = pubsub(DecodePolicy::Skip);
        let mut events = pubsub.stream::<RoomEvent>("room:1").await.unwrap();

        let sent = RoomEvent {
            room: "room:1".into(),
            seq: 9,
        };
        pubsub.publish("room:1", &sent).await.unwrap();

        assert_eq!(events.recv().await.unwrap().unwrap(), sent);
    }
}

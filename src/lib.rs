//! Topic-multiplexed pub/sub fan-out
//!
//! An external message bus delivers each published payload once per subscribed
//! connection, but an application often has many independent logical consumers
//! of the same topic. `topicast` sits in between: it holds **at most one
//! upstream bus subscription per topic** and fans every received payload out
//! to all currently attached consumers, who attach and detach independently
//! without disturbing each other or leaking the subscription.
//!
//! # Layers
//!
//! - [`bus`]: the upstream seam — the [`BusClient`] trait the dispatcher
//!   consumes, plus [`MemoryBus`], a complete in-process implementation.
//! - [`registry`]: the core — [`Dispatcher`] maps topics to per-topic
//!   [`BroadcastGroup`]s, created lazily and exactly once under concurrent
//!   demand, torn down when the upstream subscription ends or the topic is
//!   closed.
//! - [`pubsub`]: the typed facade — JSON-encoded [`PubSub::publish`] and
//!   per-consumer decoding [`TypedStream`]s with a configurable
//!   [`DecodePolicy`] for undecodable payloads.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use topicast::{MemoryBus, PubSub};
//!
//! # async fn run() {
//! let pubsub = PubSub::new(Arc::new(MemoryBus::new()));
//!
//! let mut events = pubsub.stream::<u64>("room:1").await.unwrap();
//! pubsub.publish("room:1", &7u64).await.unwrap();
//! assert_eq!(events.next().await.unwrap().unwrap(), 7);
//!
//! pubsub.close("room:1").await;
//! assert!(events.next().await.is_none());
//! # }
//! ```

pub mod bus;
pub mod pubsub;
pub mod registry;

pub use bus::{BusClient, BusError, BusReceiver, MemoryBus};
pub use pubsub::{DecodeError, DecodePolicy, PubSub, PublishError, TypedStream};
pub use registry::{BroadcastGroup, ConsumerHandle, Dispatcher, SubscribeError};

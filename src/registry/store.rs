//! Dispatcher implementation
//!
//! The central registry that maps topics to broadcast groups and keeps the
//! one-upstream-subscription-per-topic invariant. Groups are created lazily on
//! first interest; the creator reserves the map slot before touching the bus,
//! so concurrent first-time openers never double-subscribe.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::sync::RwLock;

use crate::bus::{BusClient, BusError, BusReceiver};

use super::error::SubscribeError;
use super::group::BroadcastGroup;
use super::handle::ConsumerHandle;

/// Topic-multiplexed dispatcher
///
/// Cheap to clone; all clones share one registry. Holds at most one upstream
/// bus subscription per topic and fans every received payload out to the
/// topic's attached consumers. Group lifetime is independent of consumer
/// count: dropping the last handle keeps the group and its upstream
/// subscription alive until the topic is closed or the bus unsubscribes.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

struct Shared {
    bus: Arc<dyn BusClient>,
    groups: RwLock<HashMap<String, Arc<BroadcastGroup>>>,
}

impl Dispatcher {
    /// Create a dispatcher over an injected bus client
    pub fn new(bus: Arc<dyn BusClient>) -> Self {
        Self {
            shared: Arc::new(Shared {
                bus,
                groups: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Open a consumer stream on a topic
    ///
    /// Reuses the topic's group when one is live; otherwise creates the group,
    /// establishes the upstream subscription, and attaches. Only first-time
    /// interest suspends on the bus round trip. On subscription failure the
    /// reserved group is rolled back and the error returned, so a retry starts
    /// from a clean slate.
    pub async fn open_stream(&self, topic: &str) -> Result<ConsumerHandle, SubscribeError> {
        // Fast path: live group already registered.
        {
            let groups = self.shared.groups.read().await;
            if let Some(group) = groups.get(topic) {
                if !group.is_closed() {
                    tracing::debug!(topic = %topic, "consumer attached (existing group)");
                    return Ok(group.attach());
                }
            }
        }

        // Slow path: reserve the slot under the write lock, then subscribe
        // without holding it.
        let (group, created) = {
            let mut groups = self.shared.groups.write().await;
            match groups.get(topic) {
                Some(existing) if !existing.is_closed() => (Arc::clone(existing), false),
                _ => {
                    let group = Arc::new(BroadcastGroup::new(topic));
                    groups.insert(topic.to_string(), Arc::clone(&group));
                    (group, true)
                }
            }
        };

        if created {
            let receiver = self.upstream_receiver(&group);
            if let Err(err) = self.shared.bus.subscribe(topic, receiver).await {
                tracing::warn!(topic = %topic, error = %err, "upstream subscribe failed, rolling back group");
                self.shared.evict(topic, &group).await;
                group.close();
                return Err(SubscribeError::Upstream(err));
            }
            tracing::info!(topic = %topic, "upstream subscription established");
        }

        tracing::debug!(topic = %topic, created = created, "consumer attached");
        Ok(group.attach())
    }

    /// Publish raw bytes to a topic
    ///
    /// Delegates to the bus; local consumers receive the payload through the
    /// topic's upstream subscription like any other bus subscriber, so there
    /// is no duplicate local fan-out. Returns the bus-reported delivery count.
    pub async fn publish(&self, topic: &str, payload: Bytes) -> Result<usize, BusError> {
        self.shared.bus.publish(topic, payload).await
    }

    /// Close a topic: unsubscribe upstream and end every consumer stream
    ///
    /// Idempotent; closing a topic with no group is a no-op. An unsubscribe
    /// failure on the bus is logged and ignored, consumers are still notified.
    pub async fn close_topic(&self, topic: &str) {
        let group = {
            let mut groups = self.shared.groups.write().await;
            groups.remove(topic)
        };
        let Some(group) = group else {
            return;
        };

        if let Err(err) = self.shared.bus.unsubscribe(topic).await {
            tracing::warn!(topic = %topic, error = %err, "bus unsubscribe failed during close");
        }
        if group.close() {
            tracing::info!(topic = %topic, "topic closed");
        }
    }

    /// Number of topics with a registered group
    pub async fn topic_count(&self) -> usize {
        self.shared.groups.read().await.len()
    }

    /// Number of consumers currently attached to a topic
    pub async fn consumer_count(&self, topic: &str) -> usize {
        let groups = self.shared.groups.read().await;
        groups.get(topic).map(|g| g.consumer_count()).unwrap_or(0)
    }

    /// Build the bus-facing callback pair for one topic's group.
    ///
    /// This is the only place bus wire semantics meet group semantics: each
    /// message becomes a `deliver`, the unsubscribe notification becomes a
    /// close plus eviction. The callbacks hold the registry weakly so a
    /// lingering bus subscription cannot keep a dropped dispatcher alive.
    fn upstream_receiver(&self, group: &Arc<BroadcastGroup>) -> BusReceiver {
        let deliver_group = Arc::clone(group);
        let close_group = Arc::clone(group);
        let shared = Arc::downgrade(&self.shared);

        BusReceiver::new(
            move |payload| {
                deliver_group.deliver(payload);
            },
            move || {
                // Close first so consumers observe end-of-stream promptly,
                // then evict the map entry off the callback.
                if !close_group.close() {
                    return;
                }
                tracing::info!(topic = %close_group.topic(), "upstream subscription ended, closing group");
                if let Some(shared) = shared.upgrade() {
                    let group = Arc::clone(&close_group);
                    tokio::spawn(async move {
                        shared.evict(group.topic(), &group).await;
                    });
                }
            },
        )
    }
}

impl Shared {
    /// Remove a topic's entry only if it still holds this exact group.
    ///
    /// Pointer identity guards against evicting a successor group that was
    /// created for the topic after this one closed.
    async fn evict(&self, topic: &str, group: &Arc<BroadcastGroup>) {
        let mut groups = self.groups.write().await;
        if let Some(current) = groups.get(topic) {
            if Arc::ptr_eq(current, group) {
                groups.remove(topic);
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

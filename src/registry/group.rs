//! Per-topic broadcast group
//!
//! A group owns the delivery sinks of every consumer currently attached to one
//! topic. Each sink is an unbounded channel, so fan-out never waits on a slow
//! reader. Membership is guarded by a std mutex; critical sections are short
//! and never cross an await, which also lets a consumer handle detach itself
//! from a `Drop` impl.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::handle::ConsumerHandle;

/// Fan-out state for a single topic
///
/// Created lazily by the dispatcher on first interest, closed exactly once
/// when the upstream subscription ends or the topic is closed explicitly.
/// A closed group is never reused; renewed interest in the topic builds a
/// fresh group.
pub struct BroadcastGroup {
    topic: String,
    inner: Mutex<GroupInner>,
}

struct GroupInner {
    closed: bool,
    next_id: u64,
    sinks: HashMap<u64, mpsc::UnboundedSender<Bytes>>,
}

impl BroadcastGroup {
    /// Create an open group for a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            inner: Mutex::new(GroupInner {
                closed: false,
                next_id: 0,
                sinks: HashMap::new(),
            }),
        }
    }

    /// The topic this group fans out
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Attach a new consumer and return its read handle
    ///
    /// On an already-closed group the returned handle is immediately terminal:
    /// its first `recv` observes end-of-stream rather than hanging.
    pub fn attach(self: &Arc<Self>) -> ConsumerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if inner.closed {
            drop(tx);
            return ConsumerHandle::terminal(rx, Arc::clone(self));
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.sinks.insert(id, tx);
        ConsumerHandle::attached(id, rx, Arc::clone(self))
    }

    /// Fan one payload out to every attached consumer
    ///
    /// `Bytes` clones are reference-counted, so all consumers share the one
    /// payload allocation. Returns how many sinks accepted the delivery.
    pub fn deliver(&self, payload: Bytes) -> usize {
        let inner = self.lock();
        let mut delivered = 0;
        for sink in inner.sinks.values() {
            if sink.send(payload.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Remove one consumer's sink; idempotent, unknown ids are a no-op
    pub fn detach(&self, id: u64) {
        self.lock().sinks.remove(&id);
    }

    /// Close the group, ending every attached consumer's stream
    ///
    /// One-shot: returns `true` only for the call that made the transition.
    /// Draining the sink map drops the senders, which each receiver observes
    /// as a single end-of-stream.
    pub fn close(&self) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }
        inner.closed = true;
        inner.sinks.clear();
        true
    }

    /// Whether the group has been closed
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of currently attached consumers
    pub fn consumer_count(&self) -> usize {
        self.lock().sinks.len()
    }

    fn lock(&self) -> MutexGuard<'_, GroupInner> {
        self.inner.lock().expect("group lock poisoned")
    }
}

impl std::fmt::Debug for BroadcastGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastGroup")
            .field("topic", &self.topic)
            .field("closed", &self.is_closed())
            .field("consumers", &self.consumer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_reaches_every_attached_consumer() {
        let group = Arc::new(BroadcastGroup::new("room:1"));
        let mut a = group.attach();
        let mut b = group.attach();

        let delivered = group.deliver(Bytes::from_static(b"payload"));
        assert_eq!(delivered, 2);

        assert_eq!(a.recv().await.as_deref(), Some(&b"payload"[..]));
        assert_eq!(b.recv().await.as_deref(), Some(&b"payload"[..]));
    }

    #[tokio::test]
    async fn test_deliver_preserves_order_per_consumer() {
        let group = Arc::new(BroadcastGroup::new("room:1"));
        let mut a = group.attach();

        group.deliver(Bytes::from_static(b"1"));
        group.deliver(Bytes::from_static(b"2"));
        group.deliver(Bytes::from_static(b"3"));

        assert_eq!(a.recv().await.as_deref(), Some(&b"1"[..]));
        assert_eq!(a.recv().await.as_deref(), Some(&b"2"[..]));
        assert_eq!(a.recv().await.as_deref(), Some(&b"3"[..]));
    }

    #[tokio::test]
    async fn test_close_is_one_shot_and_ends_streams() {
        let group = Arc::new(BroadcastGroup::new("room:1"));
        let mut a = group.attach();
        let mut b = group.attach();

        assert!(group.close());
        assert!(!group.close());
        assert!(group.is_closed());
        assert_eq!(group.consumer_count(), 0);

        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, None);

        // Late delivery reaches nobody.
        assert_eq!(group.deliver(Bytes::from_static(b"late")), 0);
        assert_eq!(a.recv().await, None);
    }

    #[tokio::test]
    async fn test_attach_after_close_is_terminal() {
        let group = Arc::new(BroadcastGroup::new("room:1"));
        group.close();

        let mut late = group.attach();
        assert_eq!(late.recv().await, None);
        assert_eq!(group.consumer_count(), 0);
    }

    #[tokio::test]
    async fn test_detach_is_idempotent_and_isolated() {
        let group = Arc::new(BroadcastGroup::new("room:1"));
        let a = group.attach();
        let mut b = group.attach();
        assert_eq!(group.consumer_count(), 2);

        drop(a);
        assert_eq!(group.consumer_count(), 1);

        // Unknown and repeated ids are no-ops.
        group.detach(0);
        group.detach(999);

        assert_eq!(group.deliver(Bytes::from_static(b"still here")), 1);
        assert_eq!(b.recv().await.as_deref(), Some(&b"still here"[..]));
        assert!(!group.is_closed());
    }
}

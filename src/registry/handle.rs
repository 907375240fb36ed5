//! Consumer-side read handle
//!
//! One handle per attach. The handle owns the receiving half of its delivery
//! sink and detaches itself from the group when dropped, so a cancelled
//! consumer stops receiving promptly without touching its siblings.

use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::group::BroadcastGroup;

/// One consumer's view into a topic's delivery stream
///
/// Exactly one terminal event happens per handle: `recv` returns `None` once
/// the group closes, or the handle is dropped (detaching it). A handle never
/// yields a payload after its own detach has completed.
pub struct ConsumerHandle {
    id: Option<u64>,
    rx: mpsc::UnboundedReceiver<Bytes>,
    group: Arc<BroadcastGroup>,
}

impl ConsumerHandle {
    pub(super) fn attached(
        id: u64,
        rx: mpsc::UnboundedReceiver<Bytes>,
        group: Arc<BroadcastGroup>,
    ) -> Self {
        Self {
            id: Some(id),
            rx,
            group,
        }
    }

    /// Handle for an attach that raced a close: already at end-of-stream.
    pub(super) fn terminal(rx: mpsc::UnboundedReceiver<Bytes>, group: Arc<BroadcastGroup>) -> Self {
        Self {
            id: None,
            rx,
            group,
        }
    }

    /// The topic this handle is attached to
    pub fn topic(&self) -> &str {
        self.group.topic()
    }

    /// Receive the next payload; `None` means the group closed
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Poll for the next payload
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }

    /// Detach from the group explicitly; equivalent to dropping the handle
    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.group.detach(id);
        }
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ConsumerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerHandle")
            .field("topic", &self.topic())
            .field("attached", &self.id.is_some())
            .finish()
    }
}

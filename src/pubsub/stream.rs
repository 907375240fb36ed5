//! Typed consumer stream

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::de::DeserializeOwned;

use crate::registry::ConsumerHandle;

use super::error::DecodeError;
use super::DecodePolicy;

/// A finite, typed stream of payloads for one consumer
///
/// Yields `Ok(T)` per decoded payload and `Err(DecodeError)` for payloads
/// that do not parse as `T`. Under [`DecodePolicy::Skip`] the stream
/// continues past a decode error; under [`DecodePolicy::Stop`] the error is
/// the last item. The stream ends (`None`) when the topic closes. Dropping
/// the stream detaches the consumer without affecting siblings.
pub struct TypedStream<T> {
    handle: Option<ConsumerHandle>,
    topic: String,
    policy: DecodePolicy,
    _payload: PhantomData<fn() -> T>,
}

impl<T> TypedStream<T> {
    pub(super) fn new(handle: ConsumerHandle, policy: DecodePolicy) -> Self {
        Self {
            topic: handle.topic().to_string(),
            handle: Some(handle),
            policy,
            _payload: PhantomData,
        }
    }

    /// The topic this stream consumes
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Detach immediately, dropping any undelivered payloads.
    fn finish(&mut self) {
        self.handle = None;
    }
}

impl<T: DeserializeOwned> TypedStream<T> {
    /// Receive the next item; `None` means the topic closed
    pub async fn recv(&mut self) -> Option<Result<T, DecodeError>> {
        futures::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }
}

impl<T: DeserializeOwned> Stream for TypedStream<T> {
    type Item = Result<T, DecodeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(handle) = this.handle.as_mut() else {
            return Poll::Ready(None);
        };
        match handle.poll_recv(cx) {
            Poll::Ready(Some(payload)) => match serde_json::from_slice(&payload) {
                Ok(value) => Poll::Ready(Some(Ok(value))),
                Err(err) => {
                    if this.policy == DecodePolicy::Stop {
                        this.finish();
                    }
                    Poll::Ready(Some(Err(DecodeError::new(&this.topic, err))))
                }
            },
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> std::fmt::Debug for TypedStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedStream")
            .field("topic", &self.topic)
            .field("policy", &self.policy)
            .field("live", &self.handle.is_some())
            .finish()
    }
}

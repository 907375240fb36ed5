//! Typed-facade error types

use crate::bus::BusError;

/// Error type for typed publishing
#[derive(Debug)]
pub enum PublishError {
    /// The value could not be serialized; no bus call was made
    Encode(serde_json::Error),
    /// The bus rejected the publish
    Bus(BusError),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::Encode(err) => write!(f, "payload encode failed: {}", err),
            PublishError::Bus(err) => write!(f, "bus publish failed: {}", err),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::Encode(err) => Some(err),
            PublishError::Bus(err) => Some(err),
        }
    }
}

/// A payload that could not be decoded into the consumer's expected type
///
/// Scoped to the one consumer that observed it; siblings on the same topic
/// decode their own copies and are unaffected.
#[derive(Debug)]
pub struct DecodeError {
    topic: String,
    source: serde_json::Error,
}

impl DecodeError {
    pub(super) fn new(topic: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            topic: topic.into(),
            source,
        }
    }

    /// Topic the undecodable payload arrived on
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "payload decode failed on topic {}: {}",
            self.topic, self.source
        )
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

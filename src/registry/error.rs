//! Registry error types

use crate::bus::BusError;

/// Error type for opening a consumer stream
#[derive(Debug, Clone)]
pub enum SubscribeError {
    /// Establishing the upstream bus subscription failed
    Upstream(BusError),
}

impl std::fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscribeError::Upstream(err) => {
                write!(f, "upstream subscription failed: {}", err)
            }
        }
    }
}

impl std::error::Error for SubscribeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubscribeError::Upstream(err) => Some(err),
        }
    }
}

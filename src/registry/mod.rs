//! Topic registry for pub/sub fan-out
//!
//! The registry keeps at most one upstream bus subscription per topic and
//! fans every received payload out to the topic's attached consumers.
//!
//! # Architecture
//!
//! ```text
//!                            Dispatcher
//!                  ┌──────────────────────────────┐
//!                  │ bus: Arc<dyn BusClient>      │
//!                  │ groups: RwLock<HashMap<      │
//!                  │   Topic,                     │
//!                  │   Arc<BroadcastGroup> {      │
//!                  │     sinks: id -> mpsc::Tx,   │
//!                  │   }                          │
//!                  │ >>                           │
//!                  └──────────────┬───────────────┘
//!                                 │
//!          ┌──────────────────────┼──────────────────────┐
//!          │                      │                      │
//!          ▼                      ▼                      ▼
//!     [Upstream bus]        [Consumer A]           [Consumer B]
//!     message(bytes)        handle.recv()          handle.recv()
//!          │                      ▲                      ▲
//!          └──► group.deliver() ──┴──────────────────────┘
//! ```
//!
//! # Zero-Copy Fan-out
//!
//! Payloads travel as `bytes::Bytes`, so fanning one delivery out to N
//! consumers clones a reference count, not the payload. Each consumer owns an
//! unbounded sink; a slow reader never stalls its siblings or the upstream
//! delivery path.

pub mod error;
pub mod group;
pub mod handle;
pub mod store;

pub use error::SubscribeError;
pub use group::BroadcastGroup;
pub use handle::ConsumerHandle;
pub use store::Dispatcher;

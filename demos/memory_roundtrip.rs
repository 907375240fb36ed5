//! Fan-out round trip over the in-process bus.
//!
//! Run with: cargo run --example memory_roundtrip

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use topicast::{MemoryBus, PubSub};

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    from: String,
    body: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,topicast=debug".into()),
        )
        .init();

    let pubsub = PubSub::new(Arc::new(MemoryBus::new()));

    let mut readers = Vec::new();
    for name in ["alice", "bob"] {
        let mut stream = pubsub
            .stream::<ChatMessage>("room:lobby")
            .await
            .expect("open stream");
        readers.push(tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(msg) => println!("[{name}] {}: {}", msg.from, msg.body),
                    Err(err) => println!("[{name}] undecodable payload: {err}"),
                }
            }
            println!("[{name}] stream closed");
        }));
    }

    for i in 0..3 {
        pubsub
            .publish(
                "room:lobby",
                &ChatMessage {
                    from: "server".into(),
                    body: format!("message {i}"),
                },
            )
            .await
            .expect("publish");
    }

    pubsub.close("room:lobby").await;
    for reader in readers {
        let _ = reader.await;
    }
}

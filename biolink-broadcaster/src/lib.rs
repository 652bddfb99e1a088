//! Real-time event fan-out for biolink
//!
//! This crate delivers every published event to any number of independently
//! paced subscribers. A slow or disconnected subscriber never blocks the
//! publisher or the other subscribers: each one owns an unbounded backlog.
//!
//! # Features
//!
//! - In-process subscriber registry keyed by subscription id
//! - Per-subscriber FIFO delivery
//! - Unix domain socket server streaming newline-delimited JSON
//! - New client catch-up (current daemon state)
//!
//! # Event Types
//!
//! - `sample` - Decimated sensor sample
//! - `game_event` - Event submitted by a game producer
//! - `session_start` - Recording session begins
//! - `session_end` - Recording session flushed
//! - `state_change` - Daemon state change
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use biolink_broadcaster::{BroadcastEvent, EventBroadcaster, EventStreamServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broadcaster = Arc::new(EventBroadcaster::new());
//!
//!     // Serve the live stream over a socket
//!     let server = EventStreamServer::new("/tmp/biolink_events.sock", Arc::clone(&broadcaster));
//!     server.start().await?;
//!
//!     // Or subscribe in-process
//!     let mut subscription = broadcaster.subscribe();
//!     broadcaster.publish(BroadcastEvent::sample(1.5, serde_json::json!({"EDA": 1.2})));
//!     let event = subscription.recv().await;
//!     broadcaster.unsubscribe(subscription);
//!
//!     server.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod client;
pub mod error;
pub mod events;
pub mod server;

// Re-exports
pub use broadcaster::{EventBroadcaster, Subscription};
pub use error::{BroadcasterError, Result};
pub use events::{BroadcastEvent, DaemonState};
pub use server::EventStreamServer;

//! Docent Transport - Pub/sub capability
//!
//! The exhibit runtime only ever talks to a [`PubSubClient`]: connect state,
//! subscribe, publish. Connection management, TLS and reconnects belong to
//! the concrete client. [`MemoryBroker`] is an in-process implementation with
//! retained-message support, used by the CLI simulation and by tests.
//!
//! # Subscriptions
//!
//! ```text
//! client.subscribe("state/basecamp") ──► Subscription ──► recv() ... close()
//!                                             │
//!                                             └── dropping it also unsubscribes
//! ```
//!
//! A subscription handle removes exactly its own registration; other
//! subscribers of the same topic are unaffected.

pub mod client;
pub mod codec;
pub mod memory;
pub mod publisher;

// Re-export commonly used types
pub use client::{
    Delivery, PubSubClient, PublishOptions, QoS, Subscription, SubscriptionId, TransportError,
};
pub use codec::{Codec, CodecError};
pub use memory::{BrokerConfig, MemoryBroker};
pub use publisher::CommandPublisher;

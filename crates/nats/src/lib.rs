//! NATS JetStream transport for the pulsecast pipeline.
//!
//! Provides the authenticated client, stream management, a record sink for
//! producing keyed messages and a durable pull subscription that yields
//! acknowledgeable deliveries for the core consumer loop.

/// NATS client connection and authentication management.
pub mod client;

/// JetStream specific functionality for reliable messaging.
pub mod jetstream {
    /// Configuration structures for JetStream publishers and subscribers.
    pub mod config;
    /// Keyed record sink publishing to a JetStream subject.
    pub mod publisher;
    /// Stream management utilities for creating and updating JetStream streams.
    pub mod stream;
    /// Durable pull subscription feeding the core consumer loop.
    pub mod subscriber;
}

//! Core building blocks of the pulsecast commentary pipeline.
//!
//! Holds the event model, the defensive payload decoder, the commentary
//! synthesizer and the transport-agnostic publish/consume loops. Transport
//! and oracle implementations live in their own crates and plug in through
//! the traits defined here.

pub mod catalog;
pub mod client;
pub mod commentary;
pub mod decode;
pub mod enrich;
pub mod event;
pub mod oracle;
pub mod retry;
pub mod throttle;
pub mod stream {
    pub mod consumer;
    pub mod publisher;
}
pub mod task {
    pub mod runner;
}

//! Vertex AI generative model client.
//!
//! Implements the core oracle contract on top of the `generateContent` REST
//! endpoint, authenticating with Google OAuth tokens.

/// Authenticated HTTP client for the generateContent endpoint.
pub mod client;
/// Project, location and model settings.
pub mod config;

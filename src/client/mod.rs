//! Client interface for the Gemini Developer API and Vertex AI.
//!
//! Provides [`ApiClient`], which wires configuration, request building,
//! transport and stream decoding together, and its builder.

mod builder;
mod client;

pub use builder::ApiClientBuilder;
pub use client::ApiClient;

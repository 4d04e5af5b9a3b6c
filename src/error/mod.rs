//! Error types for the Gen AI client.
//!
//! [`GenAiError`] wraps one category enum per failure source. Service-side
//! failures carry the parsed payload as [`ApiError`].

mod types;
mod categories;
mod mapper;

pub use types::*;
pub use categories::*;
pub use mapper::*;

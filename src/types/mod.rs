//! Configuration types shared by the transport and the client.

pub mod http_options;

pub use http_options::{Headers, HttpOptions, HttpRetryOptions};

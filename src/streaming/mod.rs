//! Streaming response support.
//!
//! Streaming endpoints answer with server-sent events, one JSON document per
//! `data: ` line:
//!
//! ```text
//! data: {"candidates":[...]}
//!
//! data: {"candidates":[...]}
//! ```
//!
//! The transport hands back a raw byte stream. [`BackendDispatcher`] wraps it
//! in one of the two backend shapes ([`ResponseStream`]) and
//! [`ResponseStreamDecoder`] turns that into response units.
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use integrations_genai::streaming::{BackendDispatcher, ResponseStreamDecoder};
//! use integrations_genai::transport::ChunkedStream;
//!
//! async fn print_units(chunks: ChunkedStream) {
//!     let stream = BackendDispatcher::default().select(chunks);
//!     let mut decoder = ResponseStreamDecoder::new(stream);
//!
//!     while let Some(unit) = decoder.next().await {
//!         match unit {
//!             Ok(json) => println!("{json}"),
//!             Err(e) => eprintln!("Error: {e}"),
//!         }
//!     }
//! }
//! ```

mod backend;
mod decoder;
mod dispatcher;

pub use backend::{LineIterResponse, LineIterator, LineReader, RawLine, ReadLineResponse, ResponseStream};
pub use decoder::{parse_stream_line, ResponseStreamDecoder, DATA_PREFIX};
pub use dispatcher::{BackendCapabilities, BackendDispatcher};

//! Backend selection for streaming responses.

use std::any::Any;

use super::backend::{LineIterResponse, LineIterator, LineReader, ReadLineResponse, ResponseStream};
use crate::error::StreamError;
use crate::transport::ChunkedStream;

/// Which streaming backends are available.
///
/// The line-iterator backend is always available. The read-line backend is
/// optional and controlled by the `read-line-backend` feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    read_line: bool,
}

impl BackendCapabilities {
    /// Capabilities of this build.
    pub const fn detect() -> Self {
        Self {
            read_line: cfg!(feature = "read-line-backend"),
        }
    }

    /// Only the line-iterator backend.
    pub const fn line_iter_only() -> Self {
        Self { read_line: false }
    }

    /// Both backends.
    pub const fn with_read_line() -> Self {
        Self { read_line: true }
    }

    /// True when the read-line backend can be used.
    pub const fn read_line_available(&self) -> bool {
        self.read_line
    }
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Wraps backend responses into a [`ResponseStream`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendDispatcher {
    capabilities: BackendCapabilities,
}

impl BackendDispatcher {
    /// Creates a dispatcher for the given capabilities.
    pub const fn new(capabilities: BackendCapabilities) -> Self {
        Self { capabilities }
    }

    /// The capabilities this dispatcher was created with.
    pub const fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    /// Wraps a transport byte stream in the preferred backend.
    pub fn select(&self, chunks: ChunkedStream) -> ResponseStream {
        if self.capabilities.read_line {
            ResponseStream::from_read_line(LineReader::new(chunks))
        } else {
            ResponseStream::from_line_iter(LineIterator::new(chunks))
        }
    }

    /// Recognizes a type-erased backend response.
    ///
    /// Accepts [`LineIterator`] and `Box<dyn LineIterResponse>`, plus
    /// [`LineReader`] and `Box<dyn ReadLineResponse>` when the read-line
    /// backend is available. Nothing is read from the response.
    pub fn dispatch(&self, raw: Box<dyn Any + Send>) -> Result<ResponseStream, StreamError> {
        let raw = match raw.downcast::<LineIterator>() {
            Ok(response) => return Ok(ResponseStream::LineIter(response)),
            Err(raw) => raw,
        };
        let raw = match raw.downcast::<Box<dyn LineIterResponse>>() {
            Ok(response) => return Ok(ResponseStream::LineIter(*response)),
            Err(raw) => raw,
        };

        if self.capabilities.read_line {
            let raw = match raw.downcast::<LineReader>() {
                Ok(response) => return Ok(ResponseStream::ReadLine(response)),
                Err(raw) => raw,
            };
            if let Ok(response) = raw.downcast::<Box<dyn ReadLineResponse>>() {
                return Ok(ResponseStream::ReadLine(*response));
            }
        }

        tracing::debug!(
            read_line_available = self.capabilities.read_line,
            "Unrecognized streaming response type"
        );
        Err(StreamError::UnsupportedStreamType)
    }
}

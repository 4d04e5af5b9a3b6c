//! The two supported streaming response shapes.
//!
//! A line-iterator response yields text lines and is closed when done. A
//! read-line response hands out one raw line per read, signals end of stream
//! with an empty read and is released when done. [`ResponseStream`] wraps
//! exactly one of them and gives the decoder a single way to read lines and
//! free the underlying connection.

use bytes::{Bytes, BytesMut};
use futures::{ready, StreamExt};
use std::fmt;
use std::task::{Context, Poll};

use crate::transport::{ChunkedStream, TransportError};

/// Response that iterates over text lines (line terminators removed).
pub trait LineIterResponse: Send {
    /// Polls for the next line. `None` means the iterator is exhausted.
    fn poll_next_line(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<String, TransportError>>>;

    /// Closes the response and frees the connection.
    fn close(&mut self);
}

/// Response read one raw line at a time.
pub trait ReadLineResponse: Send {
    /// Polls for the next line, including its `\n` when one was received.
    /// An empty read means end of stream.
    fn poll_read_line(&mut self, cx: &mut Context<'_>) -> Poll<Result<Bytes, TransportError>>;

    /// Releases the response and frees the connection.
    fn release(&mut self);
}

/// One physical line as read from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Line content, possibly still carrying its terminator.
    pub bytes: Bytes,
    /// False when the backend returned a fragment with no line terminator.
    pub terminated: bool,
}

/// A streaming response from one of the two supported backends.
pub enum ResponseStream {
    /// Line-iterator backend.
    LineIter(Box<dyn LineIterResponse>),
    /// Read-line backend.
    ReadLine(Box<dyn ReadLineResponse>),
}

impl ResponseStream {
    /// Wraps a line-iterator response.
    pub fn from_line_iter(response: impl LineIterResponse + 'static) -> Self {
        Self::LineIter(Box::new(response))
    }

    /// Wraps a read-line response.
    pub fn from_read_line(response: impl ReadLineResponse + 'static) -> Self {
        Self::ReadLine(Box::new(response))
    }

    /// Short name of the backend variant, for logging.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::LineIter(_) => "line-iterator",
            Self::ReadLine(_) => "read-line",
        }
    }

    /// Polls for the next line. `Ok(None)` means end of stream.
    pub fn poll_next_line(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<RawLine>, TransportError>> {
        match self {
            Self::LineIter(response) => match ready!(response.poll_next_line(cx)) {
                Some(Ok(line)) => Poll::Ready(Ok(Some(RawLine {
                    bytes: Bytes::from(line),
                    terminated: true,
                }))),
                Some(Err(e)) => Poll::Ready(Err(e)),
                None => Poll::Ready(Ok(None)),
            },
            Self::ReadLine(response) => {
                let bytes = ready!(response.poll_read_line(cx))?;
                if bytes.is_empty() {
                    return Poll::Ready(Ok(None));
                }
                let terminated = bytes.ends_with(b"\n");
                Poll::Ready(Ok(Some(RawLine { bytes, terminated })))
            }
        }
    }

    /// Closes or releases the underlying response.
    pub fn release_resources(&mut self) {
        match self {
            Self::LineIter(response) => response.close(),
            Self::ReadLine(response) => response.release(),
        }
    }
}

impl fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResponseStream").field(&self.variant_name()).finish()
    }
}

/// Line-iterator response over a transport byte stream.
///
/// Splits on `\n`, drops a trailing `\r` and decodes each line as UTF-8.
/// A final line without terminator is yielded before the iterator ends.
pub struct LineIterator {
    chunks: Option<ChunkedStream>,
    buffer: BytesMut,
}

impl LineIterator {
    /// Creates a line iterator over `chunks`.
    pub fn new(chunks: ChunkedStream) -> Self {
        Self {
            chunks: Some(chunks),
            buffer: BytesMut::new(),
        }
    }
}

impl LineIterResponse for LineIterator {
    fn poll_next_line(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<String, TransportError>>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line = self.buffer.split_to(pos + 1);
                line.truncate(pos);
                if line.ends_with(b"\r") {
                    line.truncate(pos - 1);
                }
                return Poll::Ready(Some(decode_utf8(line)));
            }

            let Some(chunks) = self.chunks.as_mut() else {
                if self.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                let tail = self.buffer.split();
                return Poll::Ready(Some(decode_utf8(tail)));
            };

            match ready!(chunks.poll_next_unpin(cx)) {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => self.chunks = None,
            }
        }
    }

    fn close(&mut self) {
        self.chunks = None;
        self.buffer.clear();
    }
}

fn decode_utf8(line: BytesMut) -> Result<String, TransportError> {
    String::from_utf8(line.to_vec()).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Read-line response over a transport byte stream.
///
/// Each read returns one `\n`-terminated line, then the unterminated tail
/// (if any), then empty reads.
pub struct LineReader {
    chunks: Option<ChunkedStream>,
    buffer: BytesMut,
}

impl LineReader {
    /// Creates a line reader over `chunks`.
    pub fn new(chunks: ChunkedStream) -> Self {
        Self {
            chunks: Some(chunks),
            buffer: BytesMut::new(),
        }
    }
}

impl ReadLineResponse for LineReader {
    fn poll_read_line(&mut self, cx: &mut Context<'_>) -> Poll<Result<Bytes, TransportError>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                return Poll::Ready(Ok(self.buffer.split_to(pos + 1).freeze()));
            }

            let Some(chunks) = self.chunks.as_mut() else {
                return Poll::Ready(Ok(self.buffer.split().freeze()));
            };

            match ready!(chunks.poll_next_unpin(cx)) {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => return Poll::Ready(Err(e)),
                None => self.chunks = None,
            }
        }
    }

    fn release(&mut self) {
        self.chunks = None;
        self.buffer.clear();
    }
}

//! Decoding of streaming responses into response units.
//!
//! Each backend line is decoded, trimmed of one trailing `\n` and one `\r`,
//! and then:
//! - skipped when empty,
//! - emitted without its prefix when it starts with `data: `,
//! - emitted whole otherwise.
//!
//! Read-line fragments (reads without a terminator) are joined with the
//! following read; whatever is still buffered at end of stream is emitted as
//! the last unit.

use bytes::BytesMut;
use futures::stream::FusedStream;
use futures::{ready, Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::backend::ResponseStream;
use super::dispatcher::BackendDispatcher;
use crate::error::{GenAiError, GenAiResult, ResponseError, StreamError};
use crate::transport::TransportError;

/// Event-stream framing prefix.
pub const DATA_PREFIX: &str = "data: ";

/// Extracts the response unit from one stream line.
///
/// Returns `None` for lines that carry nothing (empty after trimming).
pub fn parse_stream_line(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    Some(line.strip_prefix(DATA_PREFIX).unwrap_or(line))
}

fn decode_line(bytes: &[u8]) -> Result<Option<String>, TransportError> {
    let text = std::str::from_utf8(bytes).map_err(|e| TransportError::Decode(e.to_string()))?;
    Ok(parse_stream_line(text).map(str::to_string))
}

/// Lazy sequence of response units read from a [`ResponseStream`].
///
/// The underlying response is closed or released exactly once: at end of
/// stream, on the first error, or when the decoder is dropped.
pub struct ResponseStreamDecoder {
    source: Option<ResponseStream>,
    fragment: BytesMut,
}

impl ResponseStreamDecoder {
    /// Creates a decoder that owns `stream`.
    pub fn new(stream: ResponseStream) -> Self {
        Self {
            source: Some(stream),
            fragment: BytesMut::new(),
        }
    }

    /// Creates a decoder from a type-erased backend response.
    ///
    /// Fails before anything is read when the response is of neither
    /// supported shape.
    pub fn from_raw(dispatcher: &BackendDispatcher, raw: Box<dyn Any + Send>) -> Result<Self, StreamError> {
        dispatcher.dispatch(raw).map(Self::new)
    }

    /// True once the underlying response has been closed or released.
    pub fn is_released(&self) -> bool {
        self.source.is_none()
    }

    /// Deserializes every unit as JSON.
    pub fn into_json<T: DeserializeOwned>(self) -> impl FusedStream<Item = GenAiResult<T>> + Send {
        self.map(|unit: GenAiResult<String>| -> GenAiResult<T> {
            let unit = unit?;
            serde_json::from_str(&unit).map_err(|e| {
                GenAiError::from(ResponseError::Deserialization {
                    message: e.to_string(),
                    body: unit.clone(),
                })
            })
        })
    }

    fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release_resources();
            tracing::debug!(variant = source.variant_name(), "Released response stream");
        }
    }

    fn fail(&mut self, error: TransportError) -> Poll<Option<GenAiResult<String>>> {
        self.release();
        self.fragment.clear();
        Poll::Ready(Some(Err(error.into())))
    }
}

impl Stream for ResponseStreamDecoder {
    type Item = GenAiResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let Some(source) = this.source.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(source.poll_next_line(cx)) {
                Ok(Some(line)) if !line.terminated => {
                    this.fragment.extend_from_slice(&line.bytes);
                }
                Ok(Some(line)) => {
                    let decoded = if this.fragment.is_empty() {
                        decode_line(&line.bytes)
                    } else {
                        this.fragment.extend_from_slice(&line.bytes);
                        let joined = this.fragment.split();
                        decode_line(&joined)
                    };
                    match decoded {
                        Ok(Some(unit)) => return Poll::Ready(Some(Ok(unit))),
                        Ok(None) => {}
                        Err(e) => return this.fail(e),
                    }
                }
                Ok(None) => {
                    this.release();
                    let tail = this.fragment.split();
                    return match decode_line(&tail) {
                        Ok(unit) => Poll::Ready(unit.map(Ok)),
                        Err(e) => Poll::Ready(Some(Err(e.into()))),
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Transport error while reading response stream");
                    return this.fail(e);
                }
            }
        }
    }
}

impl FusedStream for ResponseStreamDecoder {
    fn is_terminated(&self) -> bool {
        self.source.is_none() && self.fragment.is_empty()
    }
}

impl Drop for ResponseStreamDecoder {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ResponseStreamDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStreamDecoder")
            .field("source", &self.source)
            .field("buffered", &self.fragment.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::{LineIterator, LineReader};
    use crate::transport::ChunkedStream;
    use bytes::Bytes;
    use futures::stream;
    use pretty_assertions::assert_eq;

    fn chunks(parts: &[&'static str]) -> ChunkedStream {
        let items: Vec<Result<Bytes, TransportError>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        Box::pin(stream::iter(items))
    }

    fn collect(decoder: ResponseStreamDecoder) -> Vec<String> {
        tokio_test::block_on(decoder.map(|unit| unit.unwrap()).collect())
    }

    #[test]
    fn test_parse_stream_line() {
        assert_eq!(parse_stream_line("data: {\"a\":1}\n"), Some("{\"a\":1}"));
        assert_eq!(parse_stream_line("hello\r\n"), Some("hello"));
        assert_eq!(parse_stream_line("\r\n"), None);
        assert_eq!(parse_stream_line(""), None);
        assert_eq!(parse_stream_line("data:no-space"), Some("data:no-space"));
        assert_eq!(parse_stream_line("data: "), Some(""));
    }

    #[test]
    fn test_decodes_line_iterator() {
        let stream = ResponseStream::from_line_iter(LineIterator::new(chunks(&[
            "data: A\n\ndata: B\n",
        ])));
        assert_eq!(collect(ResponseStreamDecoder::new(stream)), vec!["A", "B"]);
    }

    #[test]
    fn test_decodes_read_line_with_partial_tail() {
        let stream = ResponseStream::from_read_line(LineReader::new(chunks(&[
            "hello\nworld\n",
            "{\"partial\": \"data\"",
        ])));
        assert_eq!(
            collect(ResponseStreamDecoder::new(stream)),
            vec!["hello", "world", "{\"partial\": \"data\""]
        );
    }

    #[test]
    fn test_is_terminated_after_end_of_stream() {
        let stream = ResponseStream::from_line_iter(LineIterator::new(chunks(&["x\n"])));
        let mut decoder = ResponseStreamDecoder::new(stream);

        tokio_test::block_on(async {
            assert_eq!(decoder.next().await.unwrap().unwrap(), "x");
            assert!(decoder.next().await.is_none());
        });
        assert!(decoder.is_terminated());
        assert!(decoder.is_released());
    }

    #[test]
    fn test_into_json_reports_bad_units() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Unit {
            n: u32,
        }

        let stream = ResponseStream::from_line_iter(LineIterator::new(chunks(&[
            "data: {\"n\":1}\ndata: oops\n",
        ])));
        let results: Vec<GenAiResult<Unit>> =
            tokio_test::block_on(ResponseStreamDecoder::new(stream).into_json().collect());

        assert_eq!(results[0].as_ref().unwrap(), &Unit { n: 1 });
        assert!(matches!(
            results[1],
            Err(GenAiError::Response(ResponseError::Deserialization { .. }))
        ));
    }
}

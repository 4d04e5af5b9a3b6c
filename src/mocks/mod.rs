//! Mock implementations for testing.
//!
//! Provides a queue-driven HTTP transport and mock streaming responses for
//! both backend shapes. The mock responses share a [`ReleaseCounter`] so
//! tests can check how often `close`/`release` ran.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use crate::streaming::{LineIterResponse, ReadLineResponse};
use crate::transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, StreamingResponse, TransportError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A queued streaming reply: status plus body chunks.
type StreamingReply = Result<(u16, Vec<Result<Bytes, TransportError>>), TransportError>;

/// Mock HTTP transport for testing.
///
/// Responses are returned in the order they were enqueued; every request is
/// recorded for later inspection.
///
/// # Example
///
/// ```
/// use integrations_genai::mocks::MockHttpTransport;
/// use integrations_genai::transport::{HttpMethod, HttpRequest, HttpTransport};
/// use std::collections::HashMap;
///
/// # tokio_test::block_on(async {
/// let transport = MockHttpTransport::new();
/// transport.enqueue_json_response(200, r#"{"status": "ok"}"#);
///
/// let request = HttpRequest {
///     method: HttpMethod::Get,
///     url: "https://example.com".to_string(),
///     headers: HashMap::new(),
///     body: None,
///     timeout: None,
///     retry_options: None,
/// };
///
/// let response = transport.send(request).await.unwrap();
/// assert_eq!(response.status, 200);
/// transport.verify_request_count(1);
/// # });
/// ```
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, TransportError>>>>,
    streaming_responses: Arc<Mutex<VecDeque<StreamingReply>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockHttpTransport {
    /// Create a new mock HTTP transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a response to be returned by the next request.
    pub fn enqueue_response(&self, response: Result<HttpResponse, TransportError>) {
        lock(&self.responses).push_back(response);
    }

    /// Enqueue a JSON response with the given status code and body.
    pub fn enqueue_json_response(&self, status: u16, body: &str) {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        self.enqueue_response(Ok(HttpResponse {
            status,
            body: Bytes::from(body.to_string()),
            headers,
        }));
    }

    /// Enqueue an error response.
    pub fn enqueue_error(&self, error: TransportError) {
        self.enqueue_response(Err(error));
    }

    /// Enqueue a successful streaming response with the given body chunks.
    pub fn enqueue_streaming_response(&self, chunks: Vec<Bytes>) {
        self.enqueue_streaming_status(200, chunks);
    }

    /// Enqueue a streaming response with an explicit status.
    pub fn enqueue_streaming_status(&self, status: u16, chunks: Vec<Bytes>) {
        lock(&self.streaming_responses).push_back(Ok((status, chunks.into_iter().map(Ok).collect())));
    }

    /// Enqueue a streaming response whose body fails after `chunks`.
    pub fn enqueue_streaming_failure(&self, chunks: Vec<Bytes>, error: TransportError) {
        let mut items: Vec<_> = chunks.into_iter().map(Ok).collect();
        items.push(Err(error));
        lock(&self.streaming_responses).push_back(Ok((200, items)));
    }

    /// Enqueue a streaming error.
    pub fn enqueue_streaming_error(&self, error: TransportError) {
        lock(&self.streaming_responses).push_back(Err(error));
    }

    /// Get all requests that were made.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Get the last request that was made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Verify that exactly `expected` requests were made.
    pub fn verify_request_count(&self, expected: usize) {
        let actual = lock(&self.requests).len();
        assert_eq!(actual, expected, "Expected {} requests, got {}", expected, actual);
    }

    /// Verify that a request was made with the expected method and URL.
    pub fn verify_request(&self, index: usize, method: HttpMethod, url_contains: &str) {
        let requests = lock(&self.requests);
        assert!(index < requests.len(), "No request at index {}", index);

        let request = &requests[index];
        assert_eq!(request.method, method, "Expected method {:?}, got {:?}", method, request.method);
        assert!(
            request.url.contains(url_contains),
            "Expected URL to contain '{}', got '{}'",
            url_contains,
            request.url
        );
    }

    /// Verify that a request contains a specific header.
    pub fn verify_header(&self, index: usize, header_name: &str, header_value: &str) {
        let requests = lock(&self.requests);
        assert!(index < requests.len(), "No request at index {}", index);

        let actual_value = requests[index].headers.get(header_name);
        assert_eq!(
            actual_value.map(String::as_str),
            Some(header_value),
            "Expected header '{}' to be '{}', got {:?}",
            header_name,
            header_value,
            actual_value
        );
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(request);

        lock(&self.responses).pop_front().unwrap_or_else(|| {
            Err(TransportError::Connection(
                "No response configured in MockHttpTransport".into(),
            ))
        })
    }

    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse, TransportError> {
        lock(&self.requests).push(request);

        let (status, chunks) = lock(&self.streaming_responses).pop_front().unwrap_or_else(|| {
            Err(TransportError::Connection(
                "No streaming response configured in MockHttpTransport".into(),
            ))
        })?;

        Ok(StreamingResponse {
            status,
            headers: HashMap::new(),
            chunks: Box::pin(stream::iter(chunks)),
        })
    }
}

/// Counts `close`/`release` calls on mock responses.
#[derive(Debug, Clone, Default)]
pub struct ReleaseCounter(Arc<AtomicUsize>);

impl ReleaseCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded releases.
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock line-iterator response.
///
/// Yields the queued lines in order, then either ends or, when built with
/// [`MockLineResponse::hanging`], stays pending forever.
pub struct MockLineResponse {
    lines: VecDeque<Result<String, TransportError>>,
    hang_at_end: bool,
    released: ReleaseCounter,
}

impl MockLineResponse {
    /// Creates a response over `lines`.
    pub fn new<I, S>(lines: I, released: ReleaseCounter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(|l| Ok(l.into())).collect(),
            hang_at_end: false,
            released,
        }
    }

    /// Creates a response that yields `lines` and then fails with `error`.
    pub fn failing<I, S>(lines: I, error: TransportError, released: ReleaseCounter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut response = Self::new(lines, released);
        response.lines.push_back(Err(error));
        response
    }

    /// Creates a response that yields `lines` and then never completes.
    pub fn hanging<I, S>(lines: I, released: ReleaseCounter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut response = Self::new(lines, released);
        response.hang_at_end = true;
        response
    }
}

impl LineIterResponse for MockLineResponse {
    fn poll_next_line(&mut self, _cx: &mut Context<'_>) -> Poll<Option<Result<String, TransportError>>> {
        match self.lines.pop_front() {
            Some(line) => Poll::Ready(Some(line)),
            None if self.hang_at_end => Poll::Pending,
            None => Poll::Ready(None),
        }
    }

    fn close(&mut self) {
        self.released.record();
    }
}

/// Mock read-line response.
///
/// Returns the queued reads in order, then empty reads.
pub struct MockReadLineResponse {
    reads: VecDeque<Result<Bytes, TransportError>>,
    released: ReleaseCounter,
}

impl MockReadLineResponse {
    /// Creates a response that returns each line with a `\n` appended.
    pub fn new<I, S>(lines: I, released: ReleaseCounter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_reads(
            lines.into_iter().map(|line| {
                let mut line = line.into();
                line.push('\n');
                line
            }),
            released,
        )
    }

    /// Creates a response that returns each read verbatim, so reads without
    /// a trailing `\n` act as fragments.
    pub fn from_reads<I, S>(reads: I, released: ReleaseCounter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reads: reads
                .into_iter()
                .map(|read| Ok(Bytes::from(read.into())))
                .collect(),
            released,
        }
    }

    /// Creates a response from raw byte reads, for invalid UTF-8.
    pub fn from_bytes(reads: Vec<Bytes>, released: ReleaseCounter) -> Self {
        Self {
            reads: reads.into_iter().map(Ok).collect(),
            released,
        }
    }

    /// Adds a read that fails with `error`.
    pub fn then_fail(mut self, error: TransportError) -> Self {
        self.reads.push_back(Err(error));
        self
    }
}

impl ReadLineResponse for MockReadLineResponse {
    fn poll_read_line(&mut self, _cx: &mut Context<'_>) -> Poll<Result<Bytes, TransportError>> {
        Poll::Ready(self.reads.pop_front().unwrap_or_else(|| Ok(Bytes::new())))
    }

    fn release(&mut self) {
        self.released.record();
    }
}

//! HTTP transport layer.

mod error;
mod http;
mod merge;
mod reqwest;
mod request;
mod response;

pub use error::TransportError;
pub use http::{
    ChunkedStream, HttpMethod, HttpRequest, HttpResponse, HttpTransport, StreamingResponse,
};
pub use merge::{
    append_library_version_headers, library_label, merge_headers, patch_http_options,
    API_CLIENT_HEADER, RESERVED_HEADERS, USER_AGENT_HEADER,
};
pub use self::reqwest::ReqwestTransport;
pub use request::{server_timeout_secs, RequestBuilder, SERVER_TIMEOUT_HEADER};
pub use response::ResponseParser;

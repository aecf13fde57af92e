use std::sync::OnceLock;

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use regex_lite::Regex;
use tracing::error;

use crate::media::VIDEO_CONTAINER;

/// Content type every relayed attachment is served under, whatever the
/// origin says.
pub const RELAY_CONTENT_TYPE: &str = "video/mp4";

/// Boxed error for stream plumbing; concrete types vary by fetcher.
pub type StreamError = Box<dyn std::error::Error + Send + Sync>;

/// Media bytes as they arrive from the origin, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, StreamError>>;

/// Boundary to the upstream media origin. Injected so relay behavior can be
/// exercised against scripted streams in tests.
#[async_trait]
pub trait StreamFetcher: Send + Sync {
    /// Opens the origin connection. An error here means nothing was relayed
    /// yet; errors after this point surface inside the stream itself.
    async fn fetch(&self, url: &str) -> Result<ByteStream, StreamError>;
}

/// Production fetcher over a shared reqwest client.
pub struct HttpStreamFetcher {
    client: reqwest::Client,
}

impl HttpStreamFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamFetcher for HttpStreamFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, StreamError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(format!("origin returned status {}", response.status()).into());
        }

        Ok(response
            .bytes_stream()
            .map(|result| result.map_err(|e| -> StreamError { Box::new(e) }))
            .boxed())
    }
}

static FILENAME_KEEP: OnceLock<Regex> = OnceLock::new();

/// Replaces every character outside `[A-Za-z0-9-_.]` with an underscore,
/// leaving plain ASCII that needs no quoting in the attachment header.
pub fn sanitize_title(title: &str) -> String {
    let re = FILENAME_KEEP.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());
    re.replace_all(title, "_").into_owned()
}

/// Filename for the attachment header: sanitized title plus the relay
/// container extension.
pub fn attachment_filename(title: &str) -> String {
    format!("{}.{VIDEO_CONTAINER}", sanitize_title(title))
}

/// Same-origin ticket pointing the client back at the relay endpoint. The
/// ephemeral origin URL travels inside the ticket, never bare.
pub fn relay_ticket(url: &str, title: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("videoUrl", url)
        .append_pair("title", title)
        .finish();
    format!("/api/stream?{query}")
}

/// Wraps an origin stream as a downloadable attachment. Headers are
/// committed before the first body byte; chunks flow through as they
/// arrive, pulled only as fast as the client drains them. A mid-stream
/// origin error is logged and aborts the transfer, which the client
/// observes as truncation.
pub fn attachment_response(stream: ByteStream, title: &str) -> Response {
    let stream = stream.map(|result| {
        result.map_err(|e| {
            error!("relay stream error: {e}");
            e
        })
    });

    let filename = attachment_filename(title);
    Response::builder()
        .header("Content-Type", RELAY_CONTENT_TYPE)
        .header("Content-Disposition", format!("attachment; filename={filename}"))
        .body(Body::from_stream(stream))
        .unwrap()
}

use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use http::StatusCode;
use http::header::{CONTENT_TYPE, COOKIE};
use thiserror::Error;
use tracing::debug;

use cosproxy_protocol::cosine::CosineChatRequest;

pub type ByteStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// Status plus the raw streaming body. The body stays line-encoded in the
/// Cosine dialect; translation happens downstream.
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: ByteStream,
}

impl fmt::Debug for UpstreamReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamReply")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("failed to build upstream client: {0}")]
    Client(String),
}

/// Seam between the retry orchestrator and the outbound transport.
#[async_trait]
pub trait ChatUpstream: Send + Sync {
    async fn send_chat(
        &self,
        request: &CosineChatRequest,
        auth: &str,
    ) -> Result<UpstreamReply, UpstreamError>;
}

#[derive(Clone)]
pub struct CosineClient {
    base_url: String,
    http: wreq::Client,
}

impl fmt::Debug for CosineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosineClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CosineClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
        let http = wreq::Client::builder()
            .build()
            .map_err(|err| UpstreamError::Client(err.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }
}

#[async_trait]
impl ChatUpstream for CosineClient {
    async fn send_chat(
        &self,
        request: &CosineChatRequest,
        auth: &str,
    ) -> Result<UpstreamReply, UpstreamError> {
        let response = self
            .http
            .post(format!("{}/chat", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, format!("auth={auth}"))
            .json(request)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        debug!(%status, model = %request.model, "cosine chat response");
        let body = response
            .bytes_stream()
            .map(|item| item.map_err(|err| io::Error::other(err.to_string())))
            .boxed();

        Ok(UpstreamReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    #[test]
    fn reply_debug_shows_status_and_elides_the_body() {
        let reply = UpstreamReply {
            status: StatusCode::OK,
            body: stream::empty::<Result<Bytes, io::Error>>().boxed(),
        };

        let rendered = format!("{reply:?}");
        assert!(rendered.contains("200"));
        assert!(!rendered.contains("body"));
    }
}

use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::Stream;
use rand::Rng;
use rand::distr::Alphanumeric;
use time::OffsetDateTime;
use tracing::warn;

use cosproxy_protocol::cosine::StreamEvent;
use cosproxy_protocol::openai::{
    ChatChoice, ChatCompletionResponse, ChatDelta, ChatMessage, ChatUsage,
};
use cosproxy_upstream::{ByteStream, collect_response, decode_stream};

use crate::error::ProxyError;

pub(crate) fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Relays a Cosine body as client-facing SSE chunks.
pub(crate) fn stream_response(body: ByteStream, model: String) -> Response {
    let chat_id = format!("chatcmpl-{}", random_id(24));
    let created = OffsetDateTime::now_utc().unix_timestamp();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(sse_stream(body, chat_id, created, model)))
        .unwrap_or_else(|err| ProxyError::internal(err.to_string()).into_response())
}

/// One chunk per content fragment, one finish chunk (synthesized with reason
/// "stop" if the upstream never sent one), then the `[DONE]` sentinel. A
/// transport error mid-stream is logged and the stream closed the same way,
/// after everything decoded before it.
fn sse_stream(
    body: ByteStream,
    chat_id: String,
    created: i64,
    model: String,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    async_stream::stream! {
        let (mut events, mut errors) = decode_stream(body);
        let mut finish_sent = false;

        while let Some(event) = events.recv().await {
            match event {
                StreamEvent::Content(fragment) => {
                    yield Ok(sse_record(&content_chunk(&chat_id, created, &model, fragment)));
                }
                StreamEvent::Finish(finish) => {
                    finish_sent = true;
                    let reason = if finish.finish_reason.is_empty() {
                        "stop".to_string()
                    } else {
                        finish.finish_reason
                    };
                    yield Ok(sse_record(&finish_chunk(&chat_id, created, &model, reason)));
                }
                StreamEvent::Ignored => {}
            }
        }

        if let Some(err) = errors.recv().await {
            warn!(error = %err, "upstream stream failed mid-flight");
        }
        if !finish_sent {
            yield Ok(sse_record(&finish_chunk(&chat_id, created, &model, "stop".to_string())));
        }
        yield Ok(Bytes::from_static(b"data: [DONE]\n\n"));
    }
}

/// Aggregates the whole Cosine body into one `chat.completion` response.
/// Usage is reported as zeros: the upstream's token counts are optional and
/// not trusted.
pub(crate) async fn aggregate_response(
    body: ByteStream,
    model: String,
) -> Result<Response, ProxyError> {
    let (content, finish) = collect_response(body)
        .await
        .map_err(|err| ProxyError::internal(err.to_string()))?;

    let finish_reason = finish
        .map(|finish| finish.finish_reason)
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| "stop".to_string());

    let response = ChatCompletionResponse {
        id: format!("chatcmpl-{}", random_id(24)),
        object: "chat.completion",
        created: OffsetDateTime::now_utc().unix_timestamp(),
        model,
        choices: vec![ChatChoice {
            index: 0,
            message: Some(ChatMessage {
                role: "assistant".to_string(),
                content,
            }),
            delta: None,
            finish_reason: Some(finish_reason),
        }],
        usage: Some(ChatUsage::default()),
    };

    Ok(Json(response).into_response())
}

fn content_chunk(
    chat_id: &str,
    created: i64,
    model: &str,
    content: String,
) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: chat_id.to_string(),
        object: "chat.completion.chunk",
        created,
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: None,
            delta: Some(ChatDelta {
                role: None,
                content: Some(content),
            }),
            finish_reason: None,
        }],
        usage: None,
    }
}

fn finish_chunk(
    chat_id: &str,
    created: i64,
    model: &str,
    finish_reason: String,
) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: chat_id.to_string(),
        object: "chat.completion.chunk",
        created,
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: None,
            delta: Some(ChatDelta::default()),
            finish_reason: Some(finish_reason),
        }],
        usage: None,
    }
}

fn sse_record(chunk: &ChatCompletionResponse) -> Bytes {
    let json = serde_json::to_string(chunk).unwrap_or_default();
    Bytes::from(format!("data: {json}\n\n"))
}

#[cfg(test)]
mod tests {
    use std::io;

    use futures_util::{StreamExt, stream};
    use serde_json::Value;

    use super::*;

    fn ok_body(chunks: &'static [&'static str]) -> ByteStream {
        stream::iter(chunks.iter().map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))).boxed()
    }

    async fn frames(body: ByteStream) -> Vec<String> {
        sse_stream(body, "chatcmpl-test".to_string(), 1, "gpt-5".to_string())
            .map(|frame| String::from_utf8(frame.unwrap().to_vec()).unwrap())
            .collect()
            .await
    }

    fn payload(frame: &str) -> Value {
        let json = frame
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn clean_finish_emits_content_finish_then_done() {
        let body = ok_body(&[
            "0:\"Hello\"\n",
            "0:\" world\"\n",
            "e:{\"finishReason\":\"stop\"}\n",
        ]);

        let frames = frames(body).await;
        assert_eq!(frames.len(), 4);

        let first = payload(&frames[0]);
        assert_eq!(first["object"], "chat.completion.chunk");
        assert_eq!(first["choices"][0]["delta"]["content"], "Hello");
        assert!(first["choices"][0]["finish_reason"].is_null());

        let second = payload(&frames[1]);
        assert_eq!(second["choices"][0]["delta"]["content"], " world");

        let finish = payload(&frames[2]);
        assert_eq!(finish["choices"][0]["finish_reason"], "stop");
        assert!(finish["choices"][0]["delta"]["content"].is_null());

        assert_eq!(frames[3], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn missing_finish_is_synthesized_before_done() {
        let body = ok_body(&["0:\"unterminated\"\n"]);

        let frames = frames(body).await;
        assert_eq!(frames.len(), 3);
        assert_eq!(payload(&frames[1])["choices"][0]["finish_reason"], "stop");
        assert_eq!(frames[2], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn empty_finish_reason_defaults_to_stop() {
        let body = ok_body(&["e:{\"finishReason\":\"\"}\n"]);

        let frames = frames(body).await;
        assert_eq!(payload(&frames[0])["choices"][0]["finish_reason"], "stop");
    }

    #[tokio::test]
    async fn mid_stream_error_still_closes_with_done() {
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"0:\"cut\"\n")),
            Err(io::Error::other("connection reset")),
        ];
        let body = stream::iter(chunks).boxed();

        let frames = frames(body).await;
        assert_eq!(payload(&frames[0])["choices"][0]["delta"]["content"], "cut");
        assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn aggregate_builds_a_single_completion() {
        let body = ok_body(&[
            "0:\"Hi\"\n",
            "0:\" there\"\n",
            "e:{\"finishReason\":\"stop\"}\n",
        ]);

        let response = aggregate_response(body, "gpt-5".to_string()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["choices"][0]["message"]["content"], "Hi there");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
        assert_eq!(json["usage"]["total_tokens"], 0);
        assert!(json["id"].as_str().unwrap().starts_with("chatcmpl-"));
    }

    #[test]
    fn random_ids_have_the_requested_length() {
        let id = random_id(24);
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use cosproxy_protocol::cosine::{CosineChatRequest, CosineMessage};
use cosproxy_protocol::openai::ChatCompletionRequest;

use crate::core::CoreState;
use crate::dispatch::dispatch_chat;
use crate::error::ProxyError;
use crate::relay::{aggregate_response, random_id, stream_response};

pub(crate) async fn chat_completions(
    State(state): State<Arc<CoreState>>,
    body: Bytes,
) -> Response {
    let request: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return ProxyError::invalid_request(err.to_string()).into_response(),
    };

    let outbound = translate_request(&request);
    let reply = match dispatch_chat(&state.pool, state.upstream.as_ref(), outbound).await {
        Ok(reply) => reply,
        Err(err) => return err.into_response(),
    };

    if request.stream {
        stream_response(reply.body, request.model)
    } else {
        aggregate_response(reply.body, request.model)
            .await
            .unwrap_or_else(|err| err.into_response())
    }
}

/// Maps the client request into the Cosine dialect: fresh message ids and
/// timestamps per message, team assigned per attempt by the dispatcher,
/// conversation id left empty for the upstream to fill.
pub(crate) fn translate_request(request: &ChatCompletionRequest) -> CosineChatRequest {
    let messages = request
        .messages
        .iter()
        .map(|message| CosineMessage {
            content: message.content.clone(),
            role: message.role.clone(),
            id: random_id(12),
            created_at: now_rfc3339(),
        })
        .collect();

    CosineChatRequest {
        id: String::new(),
        messages,
        model: request.model.clone(),
        team_id: String::new(),
        visibility: "team".to_string(),
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use cosproxy_protocol::openai::ChatMessage;

    use super::*;

    #[test]
    fn translation_keeps_order_and_mints_fresh_ids() {
        let request = ChatCompletionRequest {
            model: "gpt-5".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "be brief".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "hi".to_string(),
                },
            ],
            stream: true,
        };

        let outbound = translate_request(&request);
        assert_eq!(outbound.model, "gpt-5");
        assert_eq!(outbound.visibility, "team");
        assert!(outbound.id.is_empty());
        assert!(outbound.team_id.is_empty());

        assert_eq!(outbound.messages.len(), 2);
        assert_eq!(outbound.messages[0].role, "system");
        assert_eq!(outbound.messages[1].content, "hi");
        assert_eq!(outbound.messages[0].id.len(), 12);
        assert_ne!(outbound.messages[0].id, outbound.messages[1].id);
        assert!(!outbound.messages[0].created_at.is_empty());
    }
}

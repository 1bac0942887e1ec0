use serde::Deserialize;

/// Finish marker carried on `e:` (possibly continued) and `d:` (final) lines.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FinishEvent {
    #[serde(rename = "finishReason", default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: FinishUsage,
    #[serde(rename = "isContinued", default)]
    pub is_continued: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct FinishUsage {
    #[serde(rename = "promptTokens")]
    pub prompt_tokens: Option<i64>,
    #[serde(rename = "completionTokens")]
    pub completion_tokens: Option<i64>,
}

impl FinishEvent {
    pub fn stopped() -> Self {
        Self {
            finish_reason: "stop".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Content(String),
    Finish(FinishEvent),
    Ignored,
}

/// Decodes one line of the Cosine wire format: `<prefix>:<payload>`.
///
/// Prefixes are matched case-sensitively. Malformed payloads degrade instead
/// of failing the stream: `0` falls back to the raw trimmed payload, `e` to a
/// synthetic `finishReason: "stop"`, and `d` is dropped. Anything else
/// (missing colon, empty prefix, unknown prefix) is ignored.
pub fn decode_line(line: &str) -> StreamEvent {
    let Some(colon) = line.find(':') else {
        return StreamEvent::Ignored;
    };
    if colon == 0 {
        return StreamEvent::Ignored;
    }

    let prefix = line[..colon].trim();
    let payload = line[colon + 1..].trim();

    match prefix {
        "0" => match serde_json::from_str::<String>(payload) {
            Ok(content) => StreamEvent::Content(content),
            Err(_) => StreamEvent::Content(payload.to_string()),
        },
        "e" => match serde_json::from_str::<FinishEvent>(payload) {
            Ok(finish) => StreamEvent::Finish(finish),
            Err(_) => StreamEvent::Finish(FinishEvent::stopped()),
        },
        "d" => match serde_json::from_str::<FinishEvent>(payload) {
            Ok(finish) => StreamEvent::Finish(finish),
            Err(_) => StreamEvent::Ignored,
        },
        _ => StreamEvent::Ignored,
    }
}

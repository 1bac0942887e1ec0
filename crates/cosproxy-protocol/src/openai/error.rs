use serde::Serialize;

/// OpenAI-style error envelope returned for every client-visible failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            error: ErrorBody {
                message: message.into(),
                code: kind.clone(),
                kind,
            },
        }
    }
}

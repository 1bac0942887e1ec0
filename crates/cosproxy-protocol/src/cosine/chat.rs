use serde::Serialize;

/// Outbound chat request in the Cosine dialect. The conversation id is left
/// empty so the upstream assigns one.
#[derive(Debug, Clone, Serialize)]
pub struct CosineChatRequest {
    pub id: String,
    pub messages: Vec<CosineMessage>,
    pub model: String,
    #[serde(rename = "teamId")]
    pub team_id: String,
    pub visibility: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CosineMessage {
    pub content: String,
    pub role: String,
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

use axum::Json;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use cosproxy_protocol::openai::{Model, ModelList};

const MODEL_CATALOG: [&str; 4] = ["gpt-5", "gpt4.1", "claude-3-7-sonnet", "gemini-2.0-flash"];

pub(crate) async fn health() -> Json<Value> {
    let time = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({ "status": "ok", "time": time }))
}

pub(crate) async fn list_models() -> Json<ModelList> {
    let data = MODEL_CATALOG
        .iter()
        .copied()
        .map(|id| Model {
            id,
            object: "model",
            created: 1_700_000_000,
            owned_by: "cosine",
        })
        .collect();
    Json(ModelList {
        object: "list",
        data,
    })
}

pub mod chat;
pub mod error;
pub mod models;

pub use chat::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatDelta, ChatMessage, ChatUsage,
};
pub use error::{ErrorBody, ErrorResponse};
pub use models::{Model, ModelList};

pub mod chat;
pub mod stream;

pub use chat::{CosineChatRequest, CosineMessage};
pub use stream::{decode_line, FinishEvent, FinishUsage, StreamEvent};

pub mod client;
pub mod stream;

pub use client::{ByteStream, ChatUpstream, CosineClient, UpstreamError, UpstreamReply};
pub use stream::{collect_response, decode_stream};

//! OpenAI-compatible chat completions adapter.
//!
//! Serves Zhipu GLM, DeepSeek, and OpenAI itself: the three backends share
//! the `chat/completions` streaming wire format and differ only in base URL
//! and a few request extensions.

mod provider;
mod serde_api;
mod transport;
mod types;

pub use provider::OpenAiProvider;
pub use transport::{
    DEEPSEEK_BASE_URL, OPENAI_BASE_URL, OpenAiChunkStream, OpenAiHttpTransport, OpenAiTransport,
    ZHIPU_BASE_URL, default_base_url,
};
pub use types::{
    OpenAiCompletion, OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiRole,
    OpenAiStreamChunk, OpenAiUsage,
};

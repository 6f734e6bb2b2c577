//! Google Gemini `streamGenerateContent` adapter.

mod provider;
mod serde_api;
mod tests;
mod transport;
mod types;

pub use provider::GeminiProvider;
pub use transport::{GEMINI_BASE_URL, GeminiChunkStream, GeminiHttpTransport, GeminiTransport};
pub use types::{
    GeminiCompletion, GeminiContent, GeminiFinishReason, GeminiRequest, GeminiRole,
    GeminiStreamChunk, GeminiUsage,
};

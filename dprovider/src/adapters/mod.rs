#[cfg(any(feature = "provider-gemini", feature = "provider-openai"))]
mod sse;

#[cfg(feature = "provider-gemini")]
pub mod gemini;

#[cfg(feature = "provider-openai")]
pub mod openai;

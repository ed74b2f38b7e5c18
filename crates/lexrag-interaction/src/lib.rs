//! LLM transport for LEXRAG.
//!
//! Provides [`ChatCompletionsClient`], an `LlmClient` that talks to any
//! OpenAI-compatible chat completions endpoint (Groq by default).

pub mod chat_completions;

pub use chat_completions::{ChatCompletionsClient, strip_reasoning};

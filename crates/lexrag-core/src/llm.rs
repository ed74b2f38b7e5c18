//! Language-model port.

use crate::error::Result;
use async_trait::async_trait;

/// Opaque text-in, text-out model capability.
///
/// Injected into the strategy objects at construction so tests can
/// substitute scripted responses.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends a single prompt and returns the model's text.
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging and stats.
    fn model(&self) -> &str;
}

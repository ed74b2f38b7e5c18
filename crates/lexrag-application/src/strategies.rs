//! LLM-backed implementations of the refinement strategy ports.

use crate::prompts::PromptLibrary;
use async_trait::async_trait;
use lexrag_core::error::Result;
use lexrag_core::llm::LlmClient;
use lexrag_core::refinement::{Corrector, Generator, Verdict, Verifier};
use std::sync::Arc;

pub struct LlmGenerator {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl LlmGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, question: &str, context: &[String]) -> Result<String> {
        let prompt = self.prompts.answer(question, context)?;
        self.llm
            .invoke(&prompt)
            .await
            .map_err(|e| e.in_stage("generating the answer"))
    }
}

/// Verifier that asks the model for a JSON verdict.
///
/// Undecodable output is logged and replaced by [`Verdict::degraded`].
pub struct LlmVerifier {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl LlmVerifier {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }
}

#[async_trait]
impl Verifier for LlmVerifier {
    async fn verify(&self, question: &str, answer: &str, context: &[String]) -> Result<Verdict> {
        let prompt = self.prompts.verification(question, answer, context)?;
        let raw = self
            .llm
            .invoke(&prompt)
            .await
            .map_err(|e| e.in_stage("verifying the answer"))?;

        match Verdict::parse(&raw) {
            Ok(verdict) => Ok(verdict),
            Err(err) => {
                tracing::warn!(error = %err, model = %self.llm.model(), "Failed to parse verification response");
                Ok(Verdict::degraded())
            }
        }
    }
}

pub struct LlmCorrector {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl LlmCorrector {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }
}

#[async_trait]
impl Corrector for LlmCorrector {
    async fn correct(
        &self,
        question: &str,
        answer: &str,
        context: &[String],
        issues: &[String],
    ) -> Result<String> {
        let prompt = self.prompts.correction(question, answer, context, issues)?;
        self.llm
            .invoke(&prompt)
            .await
            .map_err(|e| e.in_stage("correcting the answer"))
    }
}

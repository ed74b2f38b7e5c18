//! Legal RAG use case.
//!
//! `LegalRagService` is the single entry point front-ends talk to: batch
//! ingestion, session-scoped queries, stats and reset.

use crate::controller::RefinementController;
use crate::prompts::PromptLibrary;
use crate::session::{SessionCheckpointer, SessionGate};
use crate::strategies::{LlmCorrector, LlmGenerator, LlmVerifier};
use lexrag_core::config::{ConfigSnapshot, RagConfig};
use lexrag_core::corpus::{CorpusIndex, IndexStats, IngestOutcome, IngestResult, IngestionReport};
use lexrag_core::error::{LexragError, Result};
use lexrag_core::llm::LlmClient;
use lexrag_core::refinement::{Corrector, Generator, RagResponse, Verifier};
use lexrag_core::session::{DEFAULT_SESSION_ID, Session, SessionStore};
use lexrag_infrastructure::uploads::{save_upload, validate_upload};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Read-only view of the system for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub index_stats: IndexStats,
    pub config: ConfigSnapshot,
    pub sessions: usize,
}

/// Use case for answering questions about ingested legal documents.
///
/// # Concurrency
///
/// Queries that share a session ID are serialised through a [`SessionGate`];
/// queries on different sessions run concurrently and share only the
/// corpus index. Queries and ingestion hold `lifecycle` shared; `reset`
/// holds it exclusively, so nothing in flight writes into a wiped store.
pub struct LegalRagService {
    config: RagConfig,
    index: Arc<dyn CorpusIndex>,
    controller: RefinementController,
    sessions: Arc<dyn SessionStore>,
    gate: SessionGate,
    lifecycle: RwLock<()>,
}

impl LegalRagService {
    /// Builds the service with LLM-backed strategies sharing one client.
    ///
    /// # Errors
    ///
    /// `LexragError::Config` when `config` fails validation.
    pub fn new(
        config: RagConfig,
        index: Arc<dyn CorpusIndex>,
        llm: Arc<dyn LlmClient>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let prompts = Arc::new(PromptLibrary::new()?);
        Self::with_strategies(
            config,
            index,
            Arc::new(LlmGenerator::new(llm.clone(), prompts.clone())),
            Arc::new(LlmVerifier::new(llm.clone(), prompts.clone())),
            Arc::new(LlmCorrector::new(llm, prompts)),
            sessions,
        )
    }

    /// Builds the service with explicit strategy implementations.
    pub fn with_strategies(
        config: RagConfig,
        index: Arc<dyn CorpusIndex>,
        generator: Arc<dyn Generator>,
        verifier: Arc<dyn Verifier>,
        corrector: Arc<dyn Corrector>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        config.validate()?;
        let controller = RefinementController::new(
            index.clone(),
            generator,
            verifier,
            corrector,
            config.refinement_policy(),
        );

        Ok(Self {
            config,
            index,
            controller,
            sessions,
            gate: SessionGate::new(),
            lifecycle: RwLock::new(()),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Validates and ingests each file independently.
    ///
    /// A failing file is reported in its result entry and never aborts the
    /// batch.
    pub async fn process_documents(&self, files: &[PathBuf]) -> IngestionReport {
        let _running = self.lifecycle.read().await;
        let mut results = Vec::with_capacity(files.len());

        for file in files {
            let result = match self.ingest_one(file).await {
                Ok(outcome) => IngestResult::succeeded(file.clone(), outcome),
                Err(err) => {
                    tracing::warn!(
                        file = %file.display(),
                        error = %err,
                        "Failed to process document"
                    );
                    IngestResult::failed(file.clone(), err.user_message())
                }
            };
            results.push(result);
        }

        let report = IngestionReport::new(results, self.index.stats().await);
        tracing::info!(
            files = files.len(),
            successful = report.successful(),
            chunks_added = report.total_chunks_added,
            "Ingestion finished"
        );
        report
    }

    async fn ingest_one(&self, file: &Path) -> Result<IngestOutcome> {
        validate_upload(file, &self.config).await?;
        let Some(dir) = &self.config.uploads_dir else {
            return self.index.ingest(file).await;
        };

        let saved = save_upload(file, dir).await?;
        let result = self.index.ingest(&saved).await;
        // Only copies backing newly indexed content are kept.
        if !matches!(result, Ok(IngestOutcome { already_indexed: false, .. })) {
            if let Err(err) = tokio::fs::remove_file(&saved).await {
                tracing::warn!(
                    file = %saved.display(),
                    error = %err,
                    "Failed to remove unused upload copy"
                );
            }
        }
        result
    }

    /// Answers `question` within `session_id` (default session when `None`).
    pub async fn query(&self, question: &str, session_id: Option<&str>) -> Result<RagResponse> {
        self.query_with_cancel(question, session_id, CancellationToken::new())
            .await
    }

    /// Like [`LegalRagService::query`], aborting with `Cancelled` when
    /// `cancel` fires or `Timeout` after `query_timeout_secs`.
    ///
    /// An aborted query leaves the session's last VERIFY checkpoint in
    /// place; asking the same question again resumes from it.
    pub async fn query_with_cancel(
        &self,
        question: &str,
        session_id: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<RagResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(LexragError::invalid_input("question must not be empty"));
        }
        let session_id = session_id.unwrap_or(DEFAULT_SESSION_ID);
        let span = tracing::info_span!(
            "refinement",
            query_id = %Uuid::new_v4(),
            session_id = %session_id
        );

        async move {
            let _running = self.lifecycle.read().await;
            let _guard = self.gate.acquire(session_id).await;

            let session = self
                .sessions
                .get(session_id)
                .await?
                .unwrap_or_else(|| Session::new(session_id));
            let resume_from = session
                .resumable_checkpoint(question)
                .map(|checkpoint| checkpoint.state.clone());
            let checkpointer = SessionCheckpointer::new(self.sessions.clone(), session);

            let run = async {
                match resume_from {
                    Some(state) => self.controller.resume(state, &checkpointer).await,
                    None => self.controller.run(question, &checkpointer).await,
                }
            };

            let secs = self.config.query_timeout_secs;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LexragError::Cancelled),
                outcome = tokio::time::timeout(Duration::from_secs(secs), run) => {
                    outcome.unwrap_or(Err(LexragError::Timeout { secs }))
                }
            };

            match &result {
                Ok(response) => tracing::info!(
                    confidence = response.confidence,
                    status = %response.verification_status,
                    iteration = response.metadata.final_iteration_count.unwrap_or_default(),
                    "Query answered"
                ),
                Err(err) => tracing::warn!(error = %err, "Query aborted"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Index counters plus the secret-free configuration view.
    pub async fn get_system_stats(&self) -> Result<SystemStats> {
        Ok(SystemStats {
            index_stats: self.index.stats().await,
            config: self.config.snapshot(),
            sessions: self.sessions.list_ids().await?.len(),
        })
    }

    pub async fn session(&self, session_id: &str) -> Result<Option<Session>> {
        self.sessions.get(session_id).await
    }

    pub async fn session_ids(&self) -> Result<Vec<String>> {
        self.sessions.list_ids().await
    }

    /// Clears the corpus index and destroys every session.
    ///
    /// Waits for in-flight queries and ingestion to finish first.
    pub async fn reset(&self) -> Result<()> {
        let _exclusive = self.lifecycle.write().await;
        self.index.clear().await?;
        self.sessions.clear().await?;
        self.gate.prune().await;
        tracing::info!("System reset");
        Ok(())
    }
}

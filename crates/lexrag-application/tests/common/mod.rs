//! Scripted stand-ins for the refinement ports.

#![allow(dead_code)]

use async_trait::async_trait;
use lexrag_core::corpus::{CorpusIndex, IndexStats, IngestOutcome, RetrievedChunk};
use lexrag_core::error::{LexragError, Result};
use lexrag_core::refinement::{Corrector, Generator, RefinementState, Verdict, Verifier};
use lexrag_core::session::{CheckpointPhase, CheckpointSink};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Index with a fixed set of chunks.
pub struct StaticIndex {
    chunks: Vec<RetrievedChunk>,
    pub searches: AtomicUsize,
}

impl StaticIndex {
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self {
            chunks,
            searches: AtomicUsize::new(0),
        }
    }

    pub fn lease() -> Self {
        Self::new(vec![
            RetrievedChunk::new("The term of this lease is five years.", "lease.txt"),
            RetrievedChunk::new("Rent is payable monthly in advance.", "lease.txt"),
            RetrievedChunk::new("Either party may terminate on 90 days notice.", "amendment.txt"),
        ])
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl CorpusIndex for StaticIndex {
    async fn ingest(&self, _path: &Path) -> Result<IngestOutcome> {
        Err(LexragError::internal("static index is read-only"))
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.chunks.is_empty() {
            return Err(LexragError::IndexEmpty);
        }
        Ok(self.chunks.iter().take(k).cloned().collect())
    }

    async fn stats(&self) -> IndexStats {
        IndexStats {
            total_documents: 1,
            total_chunks: self.chunks.len(),
            processed_files: 1,
        }
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Generator returning "draft", counting calls and recording context.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub calls: AtomicUsize,
    pub contexts: Mutex<Vec<Vec<String>>>,
    pub delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _question: &str, context: &[String]) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.to_vec());
        Ok("draft".to_string())
    }
}

/// Verifier that plays back verdicts, repeating the last one.
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<Verdict>>,
    last: Mutex<Option<Verdict>>,
    pub calls: AtomicUsize,
    pub contexts: Mutex<Vec<Vec<String>>>,
}

impl ScriptedVerifier {
    pub fn new(verdicts: Vec<Verdict>) -> Self {
        Self {
            script: Mutex::new(verdicts.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(verdict: Verdict) -> Self {
        Self::new(vec![verdict])
    }
}

#[async_trait]
impl Verifier for ScriptedVerifier {
    async fn verify(&self, _question: &str, _answer: &str, context: &[String]) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.to_vec());

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(verdict) = next {
            *last = Some(verdict);
        }
        last.clone()
            .ok_or_else(|| LexragError::internal("verifier script is empty"))
    }
}

/// Corrector returning "corrected N"; can be told to hang forever.
#[derive(Default)]
pub struct ScriptedCorrector {
    pub calls: AtomicUsize,
    pub issues: Mutex<Vec<Vec<String>>>,
    pub contexts: Mutex<Vec<Vec<String>>>,
    pub hang: AtomicBool,
}

impl ScriptedCorrector {
    pub fn hanging() -> Self {
        let corrector = Self::default();
        corrector.hang.store(true, Ordering::SeqCst);
        corrector
    }
}

#[async_trait]
impl Corrector for ScriptedCorrector {
    async fn correct(
        &self,
        _question: &str,
        _answer: &str,
        context: &[String],
        issues: &[String],
    ) -> Result<String> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.issues.lock().unwrap().push(issues.to_vec());
        self.contexts.lock().unwrap().push(context.to_vec());
        Ok(format!("corrected {n}"))
    }
}

/// Generator that always fails like a dead endpoint.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _question: &str, _context: &[String]) -> Result<String> {
        Err(LexragError::llm("generating the answer", "HTTP 503: unavailable"))
    }
}

/// Sink that keeps every checkpoint in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub records: Mutex<Vec<(CheckpointPhase, RefinementState)>>,
}

#[async_trait]
impl CheckpointSink for RecordingSink {
    async fn record(&self, phase: CheckpointPhase, state: &RefinementState) -> Result<()> {
        self.records.lock().unwrap().push((phase, state.clone()));
        Ok(())
    }
}

pub fn issue_verdict(confidence: f64, issue: &str) -> Verdict {
    Verdict::needs_correction(confidence, vec![issue.to_string()])
}

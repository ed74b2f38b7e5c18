//! Service wiring for the CLI commands.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use lexrag_application::LegalRagService;
use lexrag_core::LexragError;
use lexrag_core::llm::LlmClient;
use lexrag_core::session::SessionStore;
use lexrag_infrastructure::{
    InMemoryCorpusIndex, InMemorySessionStore, JsonDirSessionStore, load_config,
};
use lexrag_interaction::ChatCompletionsClient;
use std::path::PathBuf;
use std::sync::Arc;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub config: Option<PathBuf>,
    pub sessions_dir: Option<PathBuf>,
    pub ephemeral: bool,
    /// Fail at startup when no API key is configured
    pub require_llm: bool,
}

pub struct App {
    pub service: Arc<LegalRagService>,
    pub index: Arc<InMemoryCorpusIndex>,
}

impl App {
    pub async fn build(options: &AppOptions) -> Result<Self> {
        let config =
            load_config(options.config.as_deref()).context("Failed to load configuration")?;
        let index = Arc::new(
            InMemoryCorpusIndex::from_config(&config).context("Failed to set up the corpus index")?,
        );

        let llm: Arc<dyn LlmClient> = match ChatCompletionsClient::try_from_config(&config) {
            Ok(client) => Arc::new(client),
            Err(err) if !options.require_llm => {
                tracing::debug!(error = %err, "Language model unavailable");
                Arc::new(UnavailableLlm {
                    model: config.llm_model.clone(),
                    reason: err.to_string(),
                })
            }
            Err(err) => return Err(err).context("Failed to set up the language model"),
        };

        let sessions = open_sessions(options).await?;
        let service = LegalRagService::new(config, index.clone(), llm, sessions)
            .context("Failed to start the service")?;

        Ok(Self {
            service: Arc::new(service),
            index,
        })
    }
}

async fn open_sessions(options: &AppOptions) -> Result<Arc<dyn SessionStore>> {
    if options.ephemeral {
        return Ok(Arc::new(InMemorySessionStore::new()));
    }
    let store = match options.sessions_dir.as_deref() {
        Some(dir) => JsonDirSessionStore::new(dir).await,
        None => JsonDirSessionStore::default_location().await,
    }
    .context("Failed to open the session directory")?;
    tracing::debug!(dir = %store.dir().display(), "Session store ready");
    Ok(Arc::new(store))
}

/// Stand-in client for commands that never call the model.
struct UnavailableLlm {
    model: String,
    reason: String,
}

#[async_trait]
impl LlmClient for UnavailableLlm {
    async fn invoke(&self, _prompt: &str) -> lexrag_core::Result<String> {
        Err(LexragError::config(self.reason.clone()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}


use crate::chat::{ChatClient, ChatSession, OpenAiCompatibleClient};
use crate::config::Config;
use crate::persona::Character;
use crate::pipeline::background::DEFAULT_QUEUE_CAPACITY;
use crate::pipeline::{
    BackgroundTasks, ComplianceMonitor, ComplianceReporter, FormatParser, ResponseProcessor,
};
use crate::prompt::PromptStore;
use crate::storage::{JsonFileStore, KeyValueStore};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Services shared by every chat session of one running app.
///
/// Built once at startup; the compliance ledger in particular is shared by all
/// sessions through this context rather than living in a global.
pub struct AppContext {
    config: Arc<Config>,
    store: Arc<dyn KeyValueStore>,
    prompts: Arc<PromptStore>,
    compliance: Arc<ComplianceMonitor>,
    tasks: Arc<BackgroundTasks>,
    client: Arc<dyn ChatClient>,
}

impl AppContext {
    /// File-backed store under the configured data dir plus the HTTP client.
    pub async fn from_config(config: Config) -> Result<Self> {
        let data_dir = config.storage.resolved_data_dir();
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&data_dir));
        let client: Arc<dyn ChatClient> = Arc::new(
            OpenAiCompatibleClient::new(&config.api).context("Invalid [api] configuration")?,
        );
        tracing::debug!(
            backend = store.name(),
            data_dir = %data_dir.display(),
            "app context ready"
        );
        Ok(Self::with_parts(config, store, client).await)
    }

    /// Must be called inside a tokio runtime; spawns the background worker.
    pub async fn with_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        client: Arc<dyn ChatClient>,
    ) -> Self {
        let prompts = Arc::new(PromptStore::new(Arc::clone(&store)));
        let compliance = Arc::new(
            ComplianceMonitor::load(Arc::clone(&store), Arc::clone(&prompts), &config.compliance)
                .await,
        );
        let tasks = Arc::new(BackgroundTasks::spawn(DEFAULT_QUEUE_CAPACITY));

        Self {
            config: Arc::new(config),
            store,
            prompts,
            compliance,
            tasks,
            client,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn prompts(&self) -> &Arc<PromptStore> {
        &self.prompts
    }

    pub fn compliance(&self) -> &Arc<ComplianceMonitor> {
        &self.compliance
    }

    pub fn reporter(&self) -> ComplianceReporter {
        ComplianceReporter::new(Arc::clone(&self.tasks), Arc::clone(&self.compliance))
    }

    /// A processor with its own history that reports to the shared ledger.
    pub fn processor(&self) -> ResponseProcessor {
        ResponseProcessor::new(
            self.config.response.clone(),
            self.config.similarity.clone(),
            self.config.rewriter.clone(),
        )
        .with_reporter(self.reporter())
    }

    pub fn parser(&self) -> FormatParser {
        FormatParser::new(self.config.display.clone())
    }

    pub fn session(&self, character: Character) -> ChatSession {
        ChatSession::new(
            character,
            Arc::clone(&self.client),
            Arc::clone(&self.prompts),
            self.processor(),
            self.parser(),
            self.config.api.clone(),
        )
    }

    /// Wait for queued violation reports to land in storage.
    pub async fn flush(&self) {
        self.tasks.flush().await;
    }
}

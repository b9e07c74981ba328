//! Shared application state.

use std::sync::Arc;

use chrono::Datelike;
use crashdesk_core::CrashDeskConfig;
use crashdesk_llm::{reply_source_from_config, LLMConfig, ReplySource};
use crashdesk_store::CrashStore;
use crashdesk_triage::ResponseParser;
use parking_lot::RwLock;
use tracing::{info, warn};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: CrashDeskConfig,
    pub store: CrashStore,
    pub parser: ResponseParser,
    pub llm_config: RwLock<LLMConfig>,
    reply_source: RwLock<Option<Arc<dyn ReplySource>>>,
}

impl AppState {
    pub fn new(config: CrashDeskConfig, store: CrashStore) -> Self {
        let paths = &config.data_paths;
        let parser = ResponseParser::load(&paths.artifact_rules_file, &paths.section_headers_file);
        let llm_config = LLMConfig::load(&paths.llm_config_file);

        let reply_source = reply_source_from_config(&llm_config, parser.headers());
        match &reply_source {
            Some(source) => info!("Model provider: {}", source.name()),
            None => warn!("No model API key configured; /api/analyze is unavailable"),
        }

        Self {
            config,
            store,
            parser,
            llm_config: RwLock::new(llm_config),
            reply_source: RwLock::new(reply_source),
        }
    }

    /// Replace the model client, e.g. with a fake in tests.
    pub fn with_reply_source(self, source: Option<Arc<dyn ReplySource>>) -> Self {
        *self.reply_source.write() = source;
        self
    }

    pub fn reply_source(&self) -> Option<Arc<dyn ReplySource>> {
        self.reply_source.read().clone()
    }

    /// Rebuild the model client after the LLM config changed.
    pub fn refresh_reply_source(&self) {
        let source = reply_source_from_config(&self.llm_config.read(), self.parser.headers());
        *self.reply_source.write() = source;
    }

    /// Reference year for case priority.
    pub fn current_year(&self) -> i32 {
        chrono::Local::now().year()
    }
}

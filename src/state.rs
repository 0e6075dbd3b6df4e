//! Application state: the session store, prompts, trial sizes and the optional
//! OpenAI client.
//!
//! The store sits behind the `SessionStore` trait so the completion workflow
//! never depends on a concrete storage engine. Without `VAULT_PATH` the vault
//! lives in memory only.

use std::{path::PathBuf, sync::Arc};

use tracing::{info, instrument};

use crate::config::{load_agent_config_from_env, Prompts, TrialSettings};
use crate::error::StoreError;
use crate::openai::OpenAI;
use crate::store::{MemoryStore, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub trials: TrialSettings,
}

impl AppState {
    /// Build state from env: load config, open the vault, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Result<Self, StoreError> {
        let cfg = load_agent_config_from_env().unwrap_or_default();

        let store: Arc<dyn SessionStore> = match std::env::var("VAULT_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                info!(target: "knowledge_quest_backend", %path, "Vault persistence enabled");
                Arc::new(MemoryStore::with_snapshot(PathBuf::from(path)).await?)
            }
            _ => {
                info!(target: "knowledge_quest_backend", "VAULT_PATH not set; vault is in-memory only");
                Arc::new(MemoryStore::new())
            }
        };

        // Build optional OpenAI client (if API key present).
        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "knowledge_quest_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        } else {
            info!(target: "knowledge_quest_backend", "OpenAI disabled (no OPENAI_API_KEY). Using local fallback content.");
        }

        Ok(Self::new(store, openai, cfg.prompts, cfg.trials))
    }

    pub fn new(store: Arc<dyn SessionStore>, openai: Option<OpenAI>, prompts: Prompts, trials: TrialSettings) -> Self {
        Self { store, openai, prompts, trials }
    }

    /// In-memory store, default prompts, no oracle.
    #[cfg(test)]
    pub fn offline() -> Self {
        Self::new(Arc::new(MemoryStore::new()), None, Prompts::default(), TrialSettings::default())
    }
}

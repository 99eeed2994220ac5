//! Application state

use crate::auth::{Authenticator, StaticTokenAuthenticator};
use crate::config::{ServerConfig, StreamSettings};
use anyhow::{Context, Result};
use quill_core::storage::{BookStore, LocalBookStore};
use quill_core::{Exporter, TypographyProfile};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Resolves and renders books
    pub exporter: Arc<Exporter>,

    /// Verifies request tokens
    pub authenticator: Arc<dyn Authenticator>,

    /// Chunking for streamed responses
    pub stream: StreamSettings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BookStore>,
        authenticator: Arc<dyn Authenticator>,
        stream: StreamSettings,
    ) -> Self {
        let profile = Arc::new(TypographyProfile::standard());
        Self::with_exporter(Exporter::new(store, profile), authenticator, stream)
    }

    /// State around an already configured exporter
    pub fn with_exporter(
        exporter: Exporter,
        authenticator: Arc<dyn Authenticator>,
        stream: StreamSettings,
    ) -> Self {
        Self {
            exporter: Arc::new(exporter),
            authenticator,
            stream,
        }
    }

    /// Build the state for a configured server
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        tokio::fs::create_dir_all(config.storage_path.join("books"))
            .await
            .with_context(|| {
                format!(
                    "Failed to create storage directory {}",
                    config.storage_path.display()
                )
            })?;

        if config.api_tokens.is_empty() {
            tracing::warn!("QUILL_API_TOKENS is empty; every export request will be rejected");
        }

        let store = Arc::new(LocalBookStore::new(&config.storage_path));
        let authenticator = Arc::new(StaticTokenAuthenticator::new(config.api_tokens.clone()));
        tracing::info!(
            storage = %config.storage_path.display(),
            tokens = config.api_tokens.len(),
            "Application state ready"
        );

        Ok(Self::new(store, authenticator, config.stream))
    }
}

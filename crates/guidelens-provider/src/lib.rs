pub mod openai;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use guidelens_schema::ActivityCategory;

pub use openai::{ollama, openai, OpenAiCompatProvider, ProviderErrorKind};

/// Prompt plus assembled session context, handed to the AI collaborator.
/// The core owns the template assembly; providers only transport it.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub context: HashMap<String, String>,
    pub category: ActivityCategory,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, category: ActivityCategory) -> Self {
        Self {
            prompt: prompt.into(),
            context: HashMap::new(),
            category,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
pub trait GuideProvider: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<String>;

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn GuideProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, provider: Arc<dyn GuideProvider>) {
        self.providers.insert(id.into(), provider);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn GuideProvider>> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("provider not found: {id}"))
    }

    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Deterministic provider for tests and offline runs.
pub struct StubProvider;

#[async_trait]
impl GuideProvider for StubProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        Ok(format!(
            "[stub:{}] {}",
            request.category.as_str(),
            request.prompt
        ))
    }
}

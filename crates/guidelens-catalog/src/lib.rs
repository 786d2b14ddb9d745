pub mod adapter;
pub mod artifact;

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use guidelens_schema::ActivityRef;

pub use adapter::{adapter_for, ContentAdapter};
pub use artifact::{ActivityStep, Artifact, ArtifactContent, StepContent, TutorialModule};

/// Read-only view over externally owned activity definitions. The session
/// core never mutates catalog content; it only resolves references and
/// derives step counts through the per-category adapters.
#[async_trait]
pub trait ActivityCatalog: Send + Sync {
    async fn resolve(&self, reference: &ActivityRef) -> Result<Artifact>;

    async fn total_steps(&self, reference: &ActivityRef) -> Result<usize> {
        let artifact = self.resolve(reference).await?;
        Ok(adapter_for(reference.category).total_steps(&artifact.content))
    }

    async fn step_content(
        &self,
        reference: &ActivityRef,
        index: usize,
    ) -> Result<Option<StepContent>> {
        let artifact = self.resolve(reference).await?;
        Ok(adapter_for(reference.category).step_content(&artifact.content, index))
    }
}

/// Catalog backed by a plain map, populated at construction time.
#[derive(Default)]
pub struct InMemoryCatalog {
    artifacts: HashMap<String, Artifact>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, artifact: Artifact) {
        self.artifacts.insert(artifact.id.clone(), artifact);
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.insert(artifact);
        self
    }
}

#[async_trait]
impl ActivityCatalog for InMemoryCatalog {
    async fn resolve(&self, reference: &ActivityRef) -> Result<Artifact> {
        self.artifacts
            .get(&reference.artifact_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown artifact: {}", reference.artifact_id))
    }
}

//! Per-category content adapters.
//!
//! Each adapter knows one content shape and derives the step count and
//! per-step view from it. Step counts must be derived identically wherever
//! navigation bounds are computed, so everything goes through these
//! adapters.

use guidelens_schema::ActivityCategory;

use crate::artifact::{ActivityStep, ArtifactContent, StepContent};

pub trait ContentAdapter: Send + Sync {
    fn total_steps(&self, content: &ArtifactContent) -> usize;
    fn step_content(&self, content: &ArtifactContent, index: usize) -> Option<StepContent>;
}

/// Select the adapter for a category.
pub fn adapter_for(category: ActivityCategory) -> &'static dyn ContentAdapter {
    match category {
        ActivityCategory::Cooking => &RecipeAdapter,
        ActivityCategory::Crafting => &CraftAdapter,
        ActivityCategory::Diy => &DiyAdapter,
        ActivityCategory::Tutorial => &TutorialAdapter,
    }
}

fn step_to_content(step: &ActivityStep) -> StepContent {
    StepContent {
        title: step.title.clone(),
        description: step.description.clone(),
        duration_minutes: step.duration_minutes,
        required_items: step.required_items.clone(),
    }
}

pub struct RecipeAdapter;

impl ContentAdapter for RecipeAdapter {
    fn total_steps(&self, content: &ArtifactContent) -> usize {
        match content {
            ArtifactContent::Recipe { steps, .. } => steps.len(),
            _ => 0,
        }
    }

    fn step_content(&self, content: &ArtifactContent, index: usize) -> Option<StepContent> {
        match content {
            ArtifactContent::Recipe { steps, .. } => steps.get(index).map(step_to_content),
            _ => None,
        }
    }
}

pub struct CraftAdapter;

impl ContentAdapter for CraftAdapter {
    fn total_steps(&self, content: &ArtifactContent) -> usize {
        match content {
            ArtifactContent::Craft { steps, .. } => steps.len(),
            _ => 0,
        }
    }

    fn step_content(&self, content: &ArtifactContent, index: usize) -> Option<StepContent> {
        match content {
            ArtifactContent::Craft { steps, .. } => steps.get(index).map(step_to_content),
            _ => None,
        }
    }
}

pub struct DiyAdapter;

impl ContentAdapter for DiyAdapter {
    fn total_steps(&self, content: &ArtifactContent) -> usize {
        match content {
            ArtifactContent::Diy { steps, .. } => steps.len(),
            _ => 0,
        }
    }

    fn step_content(&self, content: &ArtifactContent, index: usize) -> Option<StepContent> {
        match content {
            ArtifactContent::Diy { steps, .. } => steps.get(index).map(step_to_content),
            _ => None,
        }
    }
}

/// Tutorials navigate by module; each module is one step.
pub struct TutorialAdapter;

impl ContentAdapter for TutorialAdapter {
    fn total_steps(&self, content: &ArtifactContent) -> usize {
        match content {
            ArtifactContent::Tutorial { modules } => modules.len(),
            _ => 0,
        }
    }

    fn step_content(&self, content: &ArtifactContent, index: usize) -> Option<StepContent> {
        match content {
            ArtifactContent::Tutorial { modules } => modules.get(index).map(|m| StepContent {
                title: m.title.clone(),
                description: m.description.clone(),
                duration_minutes: m.duration_minutes,
                required_items: Vec::new(),
            }),
            _ => None,
        }
    }
}

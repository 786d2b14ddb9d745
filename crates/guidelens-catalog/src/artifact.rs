use guidelens_schema::ActivityCategory;
use serde::{Deserialize, Serialize};

/// An activity definition owned by the content layer. Sessions hold a
/// reference to it but never own or mutate it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub id: String,
    pub title: String,
    pub category: ActivityCategory,
    pub content: ArtifactContent,
}

/// Per-category content payload. The shape determines the step count;
/// per-category adapters do the derivation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactContent {
    Recipe {
        #[serde(default)]
        ingredients: Vec<String>,
        steps: Vec<ActivityStep>,
    },
    Craft {
        #[serde(default)]
        materials: Vec<String>,
        steps: Vec<ActivityStep>,
    },
    Diy {
        #[serde(default)]
        tools: Vec<String>,
        steps: Vec<ActivityStep>,
    },
    Tutorial {
        modules: Vec<TutorialModule>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityStep {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub required_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TutorialModule {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// What the core receives for a single step, regardless of category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepContent {
    pub title: String,
    pub description: String,
    pub duration_minutes: Option<u32>,
    pub required_items: Vec<String>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque session identifier. Freshly minted sessions get a UUIDv4 string.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Activity category. Drives step-count derivation, classifier keyword
/// tables, session goals, and fallback replies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Cooking,
    Crafting,
    Diy,
    Tutorial,
}

impl ActivityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cooking => "cooking",
            Self::Crafting => "crafting",
            Self::Diy => "diy",
            Self::Tutorial => "tutorial",
        }
    }
}

/// Reference to an externally owned activity definition. The session holds
/// this by reference only; artifact content lives in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityRef {
    pub artifact_id: String,
    pub category: ActivityCategory,
    pub title: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// Categorical tags produced by keyword classification. Universal tags
/// apply to every category; the rest are layered per category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageTag {
    HelpRequest,
    CompletionSignal,
    IssueReport,
    TechniqueQuestion,
    ExplanationRequest,
    // cooking
    TemperatureQuery,
    TimingQuery,
    // crafting
    MaterialQuestion,
    // diy
    SafetyConcern,
    MeasurementQuery,
    // tutorial
    PrerequisiteQuestion,
}

/// Coarse emotional-state tag carried on the session and fed into prompt
/// assembly.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalState {
    #[default]
    Neutral,
    Confident,
    Confused,
    Frustrated,
    Excited,
}

impl EmotionalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Confident => "confident",
            Self::Confused => "confused",
            Self::Frustrated => "frustrated",
            Self::Excited => "excited",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

/// One chat-style message. Immutable once appended; ordering within a
/// session is append order, timestamps are informational only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub at: DateTime<Utc>,
    /// Step index active when this message was authored.
    pub step_index: usize,
    #[serde(default)]
    pub tags: Vec<MessageTag>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>, step_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            at: Utc::now(),
            step_index,
            tags: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<MessageTag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Media attachment sent alongside a user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

/// State-transition notifications published by the session manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    Started {
        session_id: SessionId,
        category: ActivityCategory,
    },
    StepChanged {
        session_id: SessionId,
        step_index: usize,
    },
    StepCompleted {
        session_id: SessionId,
        step_id: String,
    },
    Paused {
        session_id: SessionId,
    },
    Resumed {
        session_id: SessionId,
    },
    MessageAppended {
        session_id: SessionId,
        role: MessageRole,
    },
    ProgressOverwritten {
        session_id: SessionId,
        step_index: usize,
    },
    Archived {
        session_id: SessionId,
        status: SessionStatus,
    },
}

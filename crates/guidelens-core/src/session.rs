use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use guidelens_schema::{
    ActivityRef, ChatMessage, EmotionalState, SessionId, SessionStatus,
};
use serde::{Deserialize, Serialize};

/// One in-progress or finished guided activity.
///
/// The session exclusively owns its message log and completed-step set.
/// The activity reference points at externally owned content; `total_steps`
/// is derived from it once at start so every bounds check agrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideSession {
    pub id: SessionId,
    pub user_id: String,
    pub activity: ActivityRef,
    pub total_steps: usize,

    pub started_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,

    pub current_step: usize,
    /// Append-only except through `reset_progress`.
    pub completed_steps: BTreeSet<String>,
    pub paused: bool,
    pub status: SessionStatus,

    /// Strictly append-ordered; timestamps are informational only.
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub emotional_state: EmotionalState,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub agent_context: HashMap<String, String>,
}

impl GuideSession {
    pub fn new(
        user_id: impl Into<String>,
        activity: ActivityRef,
        total_steps: usize,
        goals: Vec<String>,
        agent_context: HashMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            user_id: user_id.into(),
            activity,
            total_steps,
            started_at: now,
            last_active: now,
            ended_at: None,
            current_step: 0,
            completed_steps: BTreeSet::new(),
            paused: false,
            status: SessionStatus::Active,
            messages: Vec::new(),
            emotional_state: EmotionalState::default(),
            goals,
            agent_context,
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn elapsed_minutes(&self) -> i64 {
        (Utc::now() - self.started_at).num_minutes()
    }

    /// 1-based step number for user-facing text.
    pub fn step_number(&self) -> usize {
        self.current_step + 1
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.touch();
        self.messages.push(message);
    }

    /// Returns true if the id was newly inserted; re-completing is a no-op.
    pub fn complete_step(&mut self, step_id: impl Into<String>) -> bool {
        self.touch();
        self.completed_steps.insert(step_id.into())
    }

    /// The one path allowed to shrink the completed set.
    pub fn reset_progress(&mut self) {
        self.touch();
        self.current_step = 0;
        self.completed_steps.clear();
    }
}

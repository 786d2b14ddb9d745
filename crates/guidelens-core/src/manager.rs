use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use guidelens_catalog::{adapter_for, ActivityCatalog};
use guidelens_provider::GuideProvider;
use guidelens_schema::{
    ActivityRef, Attachment, ChatMessage, EmotionalState, MessageRole, SessionEvent, SessionStatus,
};
use guidelens_store::SnapshotStore;
use tokio::sync::{mpsc, RwLock};

use crate::classifier::classify;
use crate::error::SessionError;
use crate::events::SessionEvents;
use crate::navigator::{advance, in_bounds, Direction};
use crate::prompts;
use crate::session::GuideSession;

/// Bound on the most-recent-first archived session list.
pub const HISTORY_CAP: usize = 24;

/// Holds at most one current session, notifies observers of each state
/// transition, and persists a full snapshot after every successful
/// mutation.
///
/// Local mutations are applied synchronously before any collaborator call
/// awaits, so the caller sees its own action immediately regardless of
/// provider or storage latency. Persistence failures are logged and never
/// roll back in-memory state; the in-memory session stays the source of
/// truth for the process lifetime.
pub struct SessionManager {
    catalog: Arc<dyn ActivityCatalog>,
    provider: Arc<dyn GuideProvider>,
    store: SnapshotStore,
    current: RwLock<Option<GuideSession>>,
    history: RwLock<VecDeque<GuideSession>>,
    events: SessionEvents,
}

impl SessionManager {
    pub fn new(
        catalog: Arc<dyn ActivityCatalog>,
        provider: Arc<dyn GuideProvider>,
        store: SnapshotStore,
    ) -> Self {
        Self {
            catalog,
            provider,
            store,
            current: RwLock::new(None),
            history: RwLock::new(VecDeque::new()),
            events: SessionEvents::default(),
        }
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        self.events.subscribe().await
    }

    pub async fn current(&self) -> Option<GuideSession> {
        self.current.read().await.clone()
    }

    /// Most-recent-first archived sessions held in memory.
    pub async fn history(&self, limit: usize) -> Vec<GuideSession> {
        self.history
            .read()
            .await
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Start a new session for the given activity. Fails with
    /// `InvalidActivity` if the reference cannot be resolved or yields no
    /// steps; nothing is created in that case. An already-active session
    /// is archived as abandoned before the new one takes the slot.
    pub async fn start_session(
        &self,
        user_id: &str,
        activity: ActivityRef,
        initial_context: HashMap<String, String>,
    ) -> Result<GuideSession, SessionError> {
        let artifact = self
            .catalog
            .resolve(&activity)
            .await
            .map_err(|e| SessionError::InvalidActivity(e.to_string()))?;
        let total_steps = adapter_for(activity.category).total_steps(&artifact.content);
        if total_steps == 0 {
            return Err(SessionError::InvalidActivity(format!(
                "activity {} has no steps",
                activity.artifact_id
            )));
        }

        let goals = prompts::session_goals(activity.category);
        let session = GuideSession::new(user_id, activity, total_steps, goals, initial_context);

        let previous = {
            let mut slot = self.current.write().await;
            slot.replace(session.clone())
        };
        if let Some(previous) = previous {
            self.archive_session(previous, SessionStatus::Abandoned)
                .await;
        }

        self.persist(&session).await;
        self.events
            .publish(SessionEvent::Started {
                session_id: session.id.clone(),
                category: session.activity.category,
            })
            .await;
        Ok(session)
    }

    /// Advance one step. Appends a navigation-notice system message with
    /// the incoming step's title when the catalog can supply it.
    pub async fn next_step(&self) -> Result<GuideSession, SessionError> {
        let mut slot = self.current.write().await;
        let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;
        let next = advance(session.current_step, session.total_steps, Direction::Forward)?;

        let step = self
            .catalog
            .step_content(&session.activity, next)
            .await
            .ok()
            .flatten();
        session.current_step = next;
        let notice = prompts::navigation_notice(
            session.step_number(),
            session.total_steps,
            step.as_ref().map(|s| s.title.as_str()),
        );
        session.push_message(ChatMessage::new(MessageRole::System, notice, next));

        let snapshot = session.clone();
        drop(slot);

        self.persist(&snapshot).await;
        self.events
            .publish(SessionEvent::StepChanged {
                session_id: snapshot.id.clone(),
                step_index: snapshot.current_step,
            })
            .await;
        Ok(snapshot)
    }

    /// Step back one step. Boundary violations leave state untouched.
    pub async fn previous_step(&self) -> Result<GuideSession, SessionError> {
        let mut slot = self.current.write().await;
        let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;
        let prev = advance(session.current_step, session.total_steps, Direction::Backward)?;
        session.current_step = prev;
        session.touch();

        let snapshot = session.clone();
        drop(slot);

        self.persist(&snapshot).await;
        self.events
            .publish(SessionEvent::StepChanged {
                session_id: snapshot.id.clone(),
                step_index: snapshot.current_step,
            })
            .await;
        Ok(snapshot)
    }

    /// Mark a step complete. Idempotent; completing an already-completed
    /// step is a success and changes nothing.
    pub async fn complete_step(&self, step_id: &str) -> Result<GuideSession, SessionError> {
        let (snapshot, inserted) = {
            let mut slot = self.current.write().await;
            let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;
            let inserted = session.complete_step(step_id);
            (session.clone(), inserted)
        };

        self.persist(&snapshot).await;
        if inserted {
            self.events
                .publish(SessionEvent::StepCompleted {
                    session_id: snapshot.id.clone(),
                    step_id: step_id.to_string(),
                })
                .await;
        }
        Ok(snapshot)
    }

    /// Flag the session paused. Already-paused sessions are a no-op
    /// success. In-flight generation is not cancelled.
    pub async fn pause_session(&self) -> Result<GuideSession, SessionError> {
        let (snapshot, changed) = {
            let mut slot = self.current.write().await;
            let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;
            if session.paused {
                (session.clone(), false)
            } else {
                session.paused = true;
                session.status = SessionStatus::Paused;
                session.touch();
                (session.clone(), true)
            }
        };

        if changed {
            self.persist(&snapshot).await;
            self.events
                .publish(SessionEvent::Paused {
                    session_id: snapshot.id.clone(),
                })
                .await;
        }
        Ok(snapshot)
    }

    /// Unpause and append a welcome-back system message computed from the
    /// current step and elapsed time. Resuming an active session is a
    /// no-op success.
    pub async fn resume_session(&self) -> Result<GuideSession, SessionError> {
        let (snapshot, changed) = {
            let mut slot = self.current.write().await;
            let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;
            if !session.paused {
                (session.clone(), false)
            } else {
                session.paused = false;
                session.status = SessionStatus::Active;
                let welcome = prompts::welcome_back(
                    session.step_number(),
                    session.total_steps,
                    session.elapsed_minutes(),
                );
                let step = session.current_step;
                session.push_message(ChatMessage::new(MessageRole::System, welcome, step));
                (session.clone(), true)
            }
        };

        if changed {
            self.persist(&snapshot).await;
            self.events
                .publish(SessionEvent::Resumed {
                    session_id: snapshot.id.clone(),
                })
                .await;
        }
        Ok(snapshot)
    }

    /// Append the classified user message, ask the AI collaborator for a
    /// reply, append it, and return it. The user message lands before the
    /// provider call awaits; provider failure is absorbed into the fixed
    /// per-category fallback so the guide always answers.
    pub async fn process_message(
        &self,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<String, SessionError> {
        let request = {
            let mut slot = self.current.write().await;
            let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;

            let tags: Vec<_> = classify(text, session.activity.category)
                .into_iter()
                .collect();
            let step_index = session.current_step;
            let message = ChatMessage::new(MessageRole::User, text, step_index)
                .with_tags(tags)
                .with_attachments(attachments);
            session.push_message(message);

            let step = self
                .catalog
                .step_content(&session.activity, step_index)
                .await
                .ok()
                .flatten();
            let request = prompts::assemble_request(session, step.as_ref(), text);

            let snapshot = session.clone();
            drop(slot);
            self.persist(&snapshot).await;
            self.events
                .publish(SessionEvent::MessageAppended {
                    session_id: snapshot.id.clone(),
                    role: MessageRole::User,
                })
                .await;
            request
        };

        // Slot is released here: a pause while the provider runs is fine,
        // and a reply arriving after a pause is still appended.
        let category = request.category;
        let reply = match self.provider.generate(request).await {
            Ok(reply) if !reply.is_empty() => reply,
            Ok(_) => {
                tracing::warn!("provider returned empty reply, using fallback");
                prompts::fallback_reply(category).to_string()
            }
            Err(error) => {
                tracing::warn!(%error, "provider call failed, using fallback");
                prompts::fallback_reply(category).to_string()
            }
        };

        let appended = {
            let mut slot = self.current.write().await;
            match slot.as_mut() {
                Some(session) => {
                    let step_index = session.current_step;
                    session.push_message(ChatMessage::new(
                        MessageRole::Assistant,
                        reply.clone(),
                        step_index,
                    ));
                    Some(session.clone())
                }
                None => None,
            }
        };
        if let Some(snapshot) = appended {
            self.persist(&snapshot).await;
            self.events
                .publish(SessionEvent::MessageAppended {
                    session_id: snapshot.id.clone(),
                    role: MessageRole::Assistant,
                })
                .await;
        }

        Ok(reply)
    }

    pub async fn set_emotional_state(
        &self,
        state: EmotionalState,
    ) -> Result<GuideSession, SessionError> {
        let snapshot = {
            let mut slot = self.current.write().await;
            let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;
            session.emotional_state = state;
            session.touch();
            session.clone()
        };
        self.persist(&snapshot).await;
        Ok(snapshot)
    }

    /// Direct progress overwrite. Distinct from step navigation: the index
    /// is bounds-checked but nothing else is guarded, and the completed
    /// set is replaced wholesale.
    pub async fn overwrite_progress(
        &self,
        step_index: usize,
        completed_steps: BTreeSet<String>,
    ) -> Result<GuideSession, SessionError> {
        let snapshot = {
            let mut slot = self.current.write().await;
            let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;
            if !in_bounds(step_index, session.total_steps) {
                return Err(SessionError::StepOutOfRange {
                    index: step_index,
                    total: session.total_steps,
                });
            }
            session.current_step = step_index;
            session.completed_steps = completed_steps;
            session.touch();
            session.clone()
        };

        self.persist(&snapshot).await;
        self.events
            .publish(SessionEvent::ProgressOverwritten {
                session_id: snapshot.id.clone(),
                step_index: snapshot.current_step,
            })
            .await;
        Ok(snapshot)
    }

    /// Explicit reset: the only path allowed to clear the completed set.
    pub async fn reset_progress(&self) -> Result<GuideSession, SessionError> {
        let snapshot = {
            let mut slot = self.current.write().await;
            let session = slot.as_mut().ok_or(SessionError::NoActiveSession)?;
            session.reset_progress();
            session.clone()
        };
        self.persist(&snapshot).await;
        Ok(snapshot)
    }

    /// Archive the current session as completed and clear the slot.
    pub async fn complete_session(&self) -> Result<GuideSession, SessionError> {
        let session = self
            .current
            .write()
            .await
            .take()
            .ok_or(SessionError::NoActiveSession)?;
        Ok(self
            .archive_session(session, SessionStatus::Completed)
            .await)
    }

    /// Archive the current session as abandoned and clear the slot.
    pub async fn abandon_session(&self) -> Result<GuideSession, SessionError> {
        let session = self
            .current
            .write()
            .await
            .take()
            .ok_or(SessionError::NoActiveSession)?;
        Ok(self
            .archive_session(session, SessionStatus::Abandoned)
            .await)
    }

    /// Age-based cleanup sweep over durable snapshots and archives.
    pub async fn cleanup_expired(&self, days: i64) -> anyhow::Result<usize> {
        self.store.purge_expired(days).await
    }

    async fn archive_session(
        &self,
        mut session: GuideSession,
        status: SessionStatus,
    ) -> GuideSession {
        session.status = status;
        session.ended_at = Some(Utc::now());

        match serde_json::to_string(&session) {
            Ok(snapshot) => {
                if let Err(error) = self
                    .store
                    .archive(
                        &session.id.0,
                        &session.user_id,
                        status.as_str(),
                        &snapshot,
                        HISTORY_CAP,
                    )
                    .await
                {
                    tracing::warn!(%error, session_id = %session.id, "failed to archive session");
                }
            }
            Err(error) => {
                tracing::warn!(%error, session_id = %session.id, "failed to serialize session for archive");
            }
        }

        {
            let mut history = self.history.write().await;
            history.push_front(session.clone());
            history.truncate(HISTORY_CAP);
        }

        self.events
            .publish(SessionEvent::Archived {
                session_id: session.id.clone(),
                status,
            })
            .await;
        session
    }

    async fn persist(&self, session: &GuideSession) {
        match serde_json::to_string(session) {
            Ok(snapshot) => {
                if let Err(error) = self
                    .store
                    .save_snapshot(&session.id.0, &session.user_id, &snapshot)
                    .await
                {
                    tracing::warn!(%error, session_id = %session.id, "failed to persist session snapshot");
                }
            }
            Err(error) => {
                tracing::warn!(%error, session_id = %session.id, "failed to serialize session snapshot");
            }
        }
    }
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use guidelens_catalog::{ActivityStep, Artifact, ArtifactContent, InMemoryCatalog};
use guidelens_core::{SessionError, SessionManager, HISTORY_CAP};
use guidelens_provider::{GenerateRequest, GuideProvider};
use guidelens_schema::{
    ActivityCategory, ActivityRef, EmotionalState, MessageRole, MessageTag, SessionEvent,
    SessionStatus,
};
use guidelens_store::SnapshotStore;

struct EchoProvider;
struct FailProvider;
struct EmptyProvider;
struct TranscriptProvider;

#[async_trait]
impl GuideProvider for EchoProvider {
    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<String> {
        Ok(format!("echo: {}", request.prompt))
    }
}

#[async_trait]
impl GuideProvider for FailProvider {
    async fn generate(&self, _request: GenerateRequest) -> anyhow::Result<String> {
        Err(anyhow!("forced failure"))
    }
}

#[async_trait]
impl GuideProvider for EmptyProvider {
    async fn generate(&self, _request: GenerateRequest) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

#[async_trait]
impl GuideProvider for TranscriptProvider {
    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<String> {
        let mut context: Vec<_> = request.context.iter().collect();
        context.sort();
        let context = context
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(format!("[{context}] {}", request.prompt))
    }
}

fn ramen_artifact() -> Artifact {
    Artifact {
        id: "recipe-ramen".into(),
        title: "Weeknight Ramen".into(),
        category: ActivityCategory::Cooking,
        content: ArtifactContent::Recipe {
            ingredients: vec!["noodles".into(), "broth".into(), "scallions".into()],
            steps: vec![
                ActivityStep {
                    title: "Boil broth".into(),
                    description: "Bring the broth to a rolling boil.".into(),
                    duration_minutes: Some(5),
                    required_items: vec!["pot".into()],
                },
                ActivityStep {
                    title: "Cook noodles".into(),
                    description: "Add noodles and cook until tender.".into(),
                    duration_minutes: Some(3),
                    required_items: vec![],
                },
                ActivityStep {
                    title: "Garnish".into(),
                    description: "Top with sliced scallions.".into(),
                    duration_minutes: None,
                    required_items: vec!["knife".into()],
                },
            ],
        },
    }
}

fn shelf_artifact() -> Artifact {
    Artifact {
        id: "diy-shelf".into(),
        title: "Floating Shelf".into(),
        category: ActivityCategory::Diy,
        content: ArtifactContent::Diy {
            tools: vec!["drill".into(), "level".into()],
            steps: vec![
                ActivityStep {
                    title: "Mark wall".into(),
                    description: "Mark the bracket positions with a level.".into(),
                    duration_minutes: Some(10),
                    required_items: vec!["level".into(), "pencil".into()],
                },
                ActivityStep {
                    title: "Mount brackets".into(),
                    description: "Drill and mount the brackets.".into(),
                    duration_minutes: Some(20),
                    required_items: vec!["drill".into()],
                },
            ],
        },
    }
}

fn empty_artifact() -> Artifact {
    Artifact {
        id: "recipe-empty".into(),
        title: "Empty".into(),
        category: ActivityCategory::Cooking,
        content: ArtifactContent::Recipe {
            ingredients: vec![],
            steps: vec![],
        },
    }
}

fn ramen_ref() -> ActivityRef {
    ActivityRef {
        artifact_id: "recipe-ramen".into(),
        category: ActivityCategory::Cooking,
        title: "Weeknight Ramen".into(),
    }
}

fn shelf_ref() -> ActivityRef {
    ActivityRef {
        artifact_id: "diy-shelf".into(),
        category: ActivityCategory::Diy,
        title: "Floating Shelf".into(),
    }
}

fn test_catalog() -> Arc<InMemoryCatalog> {
    Arc::new(
        InMemoryCatalog::new()
            .with_artifact(ramen_artifact())
            .with_artifact(shelf_artifact())
            .with_artifact(empty_artifact()),
    )
}

fn test_manager(provider: Arc<dyn GuideProvider>) -> SessionManager {
    SessionManager::new(
        test_catalog(),
        provider,
        SnapshotStore::open_in_memory().unwrap(),
    )
}

async fn start_ramen(manager: &SessionManager) -> guidelens_core::GuideSession {
    manager
        .start_session("user-1", ramen_ref(), HashMap::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn start_session_initial_state() {
    let manager = test_manager(Arc::new(EchoProvider));
    let session = start_ramen(&manager).await;

    assert_eq!(session.current_step, 0);
    assert_eq!(session.total_steps, 3);
    assert_eq!(session.status, SessionStatus::Active);
    assert!(!session.paused);
    assert!(session.completed_steps.is_empty());
    assert!(session.messages.is_empty());
    assert_eq!(session.emotional_state, EmotionalState::Neutral);
    assert!(!session.goals.is_empty());
    assert!(session.ended_at.is_none());

    let current = manager.current().await.unwrap();
    assert_eq!(current.id, session.id);
}

#[tokio::test]
async fn start_session_unknown_artifact_fails_without_session() {
    let manager = test_manager(Arc::new(EchoProvider));
    let reference = ActivityRef {
        artifact_id: "missing".into(),
        category: ActivityCategory::Cooking,
        title: "Missing".into(),
    };

    let err = manager
        .start_session("user-1", reference, HashMap::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::InvalidActivity(_)));
    assert!(manager.current().await.is_none());
}

#[tokio::test]
async fn start_session_zero_steps_fails() {
    let manager = test_manager(Arc::new(EchoProvider));
    let reference = ActivityRef {
        artifact_id: "recipe-empty".into(),
        category: ActivityCategory::Cooking,
        title: "Empty".into(),
    };

    let err = manager
        .start_session("user-1", reference, HashMap::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::InvalidActivity(_)));
    assert!(manager.current().await.is_none());
}

#[tokio::test]
async fn start_session_archives_existing_as_abandoned() {
    let manager = test_manager(Arc::new(EchoProvider));
    let first = start_ramen(&manager).await;
    let second = manager
        .start_session("user-1", shelf_ref(), HashMap::new())
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(manager.current().await.unwrap().id, second.id);

    let history = manager.history(10).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, first.id);
    assert_eq!(history[0].status, SessionStatus::Abandoned);
    assert!(history[0].ended_at.is_some());
}

#[tokio::test]
async fn next_step_advances_and_appends_notice() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let session = manager.next_step().await.unwrap();
    assert_eq!(session.current_step, 1);
    assert_eq!(session.messages.len(), 1);
    let notice = &session.messages[0];
    assert_eq!(notice.role, MessageRole::System);
    assert_eq!(notice.step_index, 1);
    assert!(notice.content.contains("step 2 of 3"));
    assert!(notice.content.contains("Cook noodles"));
}

#[tokio::test]
async fn previous_step_moves_back_without_notice() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;
    manager.next_step().await.unwrap();

    let session = manager.previous_step().await.unwrap();
    assert_eq!(session.current_step, 0);
    // Only the forward notice remains.
    assert_eq!(session.messages.len(), 1);
}

#[tokio::test]
async fn boundary_errors_leave_state_untouched() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let err = manager.previous_step().await.err().unwrap();
    assert_eq!(err, SessionError::AtFirstStep);

    manager.next_step().await.unwrap();
    manager.next_step().await.unwrap();
    let err = manager.next_step().await.err().unwrap();
    assert_eq!(err, SessionError::AtLastStep);

    let session = manager.current().await.unwrap();
    assert_eq!(session.current_step, 2);
    // Two forward notices, no message from the failed attempts.
    assert_eq!(session.messages.len(), 2);
}

#[tokio::test]
async fn complete_step_is_idempotent() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let first = manager.complete_step("step-0").await.unwrap();
    let second = manager.complete_step("step-0").await.unwrap();

    assert_eq!(first.completed_steps.len(), 1);
    assert_eq!(second.completed_steps.len(), 1);
    assert!(second.completed_steps.contains("step-0"));
}

#[tokio::test]
async fn completed_steps_survive_navigation() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    manager.complete_step("step-0").await.unwrap();
    manager.next_step().await.unwrap();
    manager.previous_step().await.unwrap();
    manager.pause_session().await.unwrap();
    let session = manager.resume_session().await.unwrap();

    assert!(session.completed_steps.contains("step-0"));
}

#[tokio::test]
async fn pause_and_resume_roundtrip() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let paused = manager.pause_session().await.unwrap();
    assert!(paused.paused);
    assert_eq!(paused.status, SessionStatus::Paused);

    // Pausing again is a no-op success.
    let again = manager.pause_session().await.unwrap();
    assert!(again.paused);

    let resumed = manager.resume_session().await.unwrap();
    assert!(!resumed.paused);
    assert_eq!(resumed.status, SessionStatus::Active);

    let welcome = resumed.messages.last().unwrap();
    assert_eq!(welcome.role, MessageRole::System);
    assert!(welcome.content.contains("step 1 of 3"));
    assert!(welcome.content.contains("minutes"));
}

#[tokio::test]
async fn resume_active_session_is_noop() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let session = manager.resume_session().await.unwrap();
    assert!(!session.paused);
    assert!(session.messages.is_empty());
}

#[tokio::test]
async fn process_message_appends_user_and_assistant() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let reply = manager
        .process_message("how long do I boil the broth?", vec![])
        .await
        .unwrap();
    assert_eq!(reply, "echo: how long do I boil the broth?");

    let session = manager.current().await.unwrap();
    assert_eq!(session.messages.len(), 2);

    let user = &session.messages[0];
    assert_eq!(user.role, MessageRole::User);
    assert_eq!(user.step_index, 0);
    assert!(user.tags.contains(&MessageTag::TimingQuery));

    let assistant = &session.messages[1];
    assert_eq!(assistant.role, MessageRole::Assistant);
    assert_eq!(assistant.content, reply);
}

#[tokio::test]
async fn process_message_absorbs_provider_failure() {
    let manager = test_manager(Arc::new(FailProvider));
    start_ramen(&manager).await;

    let reply = manager.process_message("help me please", vec![]).await.unwrap();
    assert!(!reply.is_empty());

    let session = manager.current().await.unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[0].role, MessageRole::User);
    assert_eq!(session.messages[1].role, MessageRole::Assistant);
    assert_eq!(session.messages[1].content, reply);
}

#[tokio::test]
async fn process_message_replaces_empty_reply_with_fallback() {
    let manager = test_manager(Arc::new(EmptyProvider));
    start_ramen(&manager).await;

    let reply = manager.process_message("hello", vec![]).await.unwrap();
    assert!(!reply.is_empty());
}

#[tokio::test]
async fn process_message_tags_follow_category() {
    let manager = test_manager(Arc::new(EchoProvider));
    manager
        .start_session("user-1", shelf_ref(), HashMap::new())
        .await
        .unwrap();

    manager
        .process_message("I need help with this", vec![])
        .await
        .unwrap();

    let session = manager.current().await.unwrap();
    let tags = &session.messages[0].tags;
    assert!(tags.contains(&MessageTag::HelpRequest));
    assert!(!tags.contains(&MessageTag::SafetyConcern));
}

#[tokio::test]
async fn process_message_context_carries_session_state() {
    let manager = test_manager(Arc::new(TranscriptProvider));
    start_ramen(&manager).await;
    manager.next_step().await.unwrap();
    manager
        .set_emotional_state(EmotionalState::Frustrated)
        .await
        .unwrap();

    let reply = manager.process_message("this is not working", vec![]).await.unwrap();
    assert!(reply.contains("step=2/3"));
    assert!(reply.contains("emotional_state=frustrated"));
    assert!(reply.contains("activity=Weeknight Ramen"));
}

#[tokio::test]
async fn process_message_without_session_fails() {
    let manager = test_manager(Arc::new(EchoProvider));
    let err = manager.process_message("hello", vec![]).await.err().unwrap();
    assert_eq!(err, SessionError::NoActiveSession);
}

#[tokio::test]
async fn set_emotional_state_sticks() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let session = manager
        .set_emotional_state(EmotionalState::Confused)
        .await
        .unwrap();
    assert_eq!(session.emotional_state, EmotionalState::Confused);
    assert_eq!(
        manager.current().await.unwrap().emotional_state,
        EmotionalState::Confused
    );
}

#[tokio::test]
async fn overwrite_progress_replaces_step_and_set() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;
    manager.complete_step("step-0").await.unwrap();

    let mut completed = BTreeSet::new();
    completed.insert("step-1".to_string());
    let session = manager.overwrite_progress(2, completed).await.unwrap();

    assert_eq!(session.current_step, 2);
    assert!(session.completed_steps.contains("step-1"));
    assert!(!session.completed_steps.contains("step-0"));
}

#[tokio::test]
async fn overwrite_progress_out_of_range_fails() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let err = manager
        .overwrite_progress(3, BTreeSet::new())
        .await
        .err()
        .unwrap();
    assert_eq!(err, SessionError::StepOutOfRange { index: 3, total: 3 });
    assert_eq!(manager.current().await.unwrap().current_step, 0);
}

#[tokio::test]
async fn reset_progress_clears_completed_and_rewinds() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;
    manager.next_step().await.unwrap();
    manager.complete_step("step-0").await.unwrap();

    let session = manager.reset_progress().await.unwrap();
    assert_eq!(session.current_step, 0);
    assert!(session.completed_steps.is_empty());
}

#[tokio::test]
async fn complete_session_archives_and_clears_slot() {
    let manager = test_manager(Arc::new(EchoProvider));
    let started = start_ramen(&manager).await;

    let archived = manager.complete_session().await.unwrap();
    assert_eq!(archived.id, started.id);
    assert_eq!(archived.status, SessionStatus::Completed);
    assert!(archived.ended_at.is_some());
    assert!(manager.current().await.is_none());

    let history = manager.history(10).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, SessionStatus::Completed);

    let err = manager.complete_session().await.err().unwrap();
    assert_eq!(err, SessionError::NoActiveSession);
}

#[tokio::test]
async fn abandon_session_archives_as_abandoned() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;

    let archived = manager.abandon_session().await.unwrap();
    assert_eq!(archived.status, SessionStatus::Abandoned);
    assert!(manager.current().await.is_none());
}

#[tokio::test]
async fn history_is_bounded_and_most_recent_first() {
    let manager = test_manager(Arc::new(EchoProvider));
    let mut last_id = None;
    for _ in 0..HISTORY_CAP + 6 {
        let session = start_ramen(&manager).await;
        last_id = Some(session.id.clone());
        manager.complete_session().await.unwrap();
    }

    let history = manager.history(usize::MAX).await;
    assert_eq!(history.len(), HISTORY_CAP);
    assert_eq!(history[0].id, last_id.unwrap());

    let limited = manager.history(5).await;
    assert_eq!(limited.len(), 5);
    assert_eq!(limited[0].id, history[0].id);
}

#[tokio::test]
async fn snapshots_persist_eagerly_and_survive_reload() {
    let store = SnapshotStore::open_in_memory().unwrap();
    let manager = SessionManager::new(test_catalog(), Arc::new(EchoProvider), store.clone());

    let session = start_ramen(&manager).await;
    manager.next_step().await.unwrap();
    manager.complete_step("step-0").await.unwrap();

    let raw = store.load_snapshot(&session.id.0).await.unwrap().unwrap();
    let restored: guidelens_core::GuideSession = serde_json::from_str(&raw).unwrap();
    assert_eq!(restored.id, session.id);
    assert_eq!(restored.current_step, 1);
    assert!(restored.completed_steps.contains("step-0"));
}

#[tokio::test]
async fn archived_snapshot_leaves_live_table() {
    let store = SnapshotStore::open_in_memory().unwrap();
    let manager = SessionManager::new(test_catalog(), Arc::new(EchoProvider), store.clone());

    let session = start_ramen(&manager).await;
    manager.complete_session().await.unwrap();

    assert!(store.load_snapshot(&session.id.0).await.unwrap().is_none());
    let archived = store.recent_history(10).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].session_id, session.id.0);
    assert_eq!(archived[0].status, "completed");
}

#[tokio::test]
async fn events_track_the_session_lifecycle() {
    let manager = test_manager(Arc::new(EchoProvider));
    let mut events = manager.subscribe().await;

    start_ramen(&manager).await;
    manager.next_step().await.unwrap();
    manager.complete_step("step-0").await.unwrap();
    manager.pause_session().await.unwrap();
    manager.resume_session().await.unwrap();
    manager.process_message("hello", vec![]).await.unwrap();
    manager.complete_session().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert!(matches!(seen[0], SessionEvent::Started { .. }));
    assert!(matches!(seen[1], SessionEvent::StepChanged { step_index: 1, .. }));
    assert!(matches!(seen[2], SessionEvent::StepCompleted { .. }));
    assert!(matches!(seen[3], SessionEvent::Paused { .. }));
    assert!(matches!(seen[4], SessionEvent::Resumed { .. }));
    assert!(matches!(
        seen[5],
        SessionEvent::MessageAppended {
            role: MessageRole::User,
            ..
        }
    ));
    assert!(matches!(
        seen[6],
        SessionEvent::MessageAppended {
            role: MessageRole::Assistant,
            ..
        }
    ));
    assert!(matches!(
        seen[7],
        SessionEvent::Archived {
            status: SessionStatus::Completed,
            ..
        }
    ));
    assert_eq!(seen.len(), 8);
}

#[tokio::test]
async fn repeated_complete_step_publishes_once() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;
    let mut events = manager.subscribe().await;

    manager.complete_step("step-0").await.unwrap();
    manager.complete_step("step-0").await.unwrap();

    let mut completed = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::StepCompleted { .. }) {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn cleanup_expired_delegates_to_store() {
    let manager = test_manager(Arc::new(EchoProvider));
    start_ramen(&manager).await;
    let purged = manager.cleanup_expired(30).await.unwrap();
    assert_eq!(purged, 0);
}

//! The demonstration-driven training state machine.
//!
//! One session per site context. Lifecycle: `Inactive → Training →
//! Inactive`, with a nested guidance sub-state (`Training ⇄ Guided`) while
//! a selection prompt is pending. Precondition violations come back as
//! typed failures, never panics; panics are reserved for states the machine
//! cannot legally reach.

use super::guidance::GuidanceInstruction;
use crate::ports::{GuidanceError, StorageError};
use mimic_common::protocol::{
    AutomationPatternData, AutomationRequest, ElementSelectedEvent, ExecutionContext,
    PatternLearningRequested,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Inactive,
    Training,
    /// Training with a selection prompt awaiting confirmation.
    Guided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningFailureReason {
    SessionNotActive,
    EmptySelector,
}

impl std::fmt::Display for LearningFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearningFailureReason::SessionNotActive => write!(f, "training session is not active"),
            LearningFailureReason::EmptySelector => write!(f, "selected element has no selector"),
        }
    }
}

/// Expected, recoverable learning failure. Carried as data so one bad
/// demonstration never takes the session down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Pattern learning failed: {reason}")]
pub struct PatternLearningFailed {
    pub reason: LearningFailureReason,
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Training session is not active")]
    NotActive,
    #[error("No guidance awaiting confirmation")]
    NoPendingGuidance,
    #[error(transparent)]
    Learning(#[from] PatternLearningFailed),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Guidance error: {0}")]
    Guidance(#[from] GuidanceError),
}

/// Result of `enable_training_mode`. Enabling twice is not an error, just
/// a no-op the caller may want to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnableOutcome {
    Started,
    AlreadyActive,
}

/// What a finished session accomplished.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub started_at: SystemTime,
    pub ended_at: SystemTime,
    pub duration: Duration,
    pub patterns_learned: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct TrainingSession {
    mode: SessionMode,
    started_at: Option<SystemTime>,
    ended_at: Option<SystemTime>,
    current_context: Option<ExecutionContext>,
    learned_patterns: Vec<AutomationPatternData>,
    active_guidance: Option<GuidanceInstruction>,
    pattern_seq: u64,
}

impl Default for SessionMode {
    fn default() -> Self {
        SessionMode::Inactive
    }
}

impl TrainingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode != SessionMode::Inactive
    }

    pub fn current_context(&self) -> Option<&ExecutionContext> {
        self.current_context.as_ref()
    }

    pub fn learned_patterns(&self) -> &[AutomationPatternData] {
        &self.learned_patterns
    }

    pub fn active_guidance(&self) -> Option<&GuidanceInstruction> {
        self.active_guidance.as_ref()
    }

    /// `Inactive → Training`, capturing the site context. Idempotent when
    /// already active.
    pub fn enable_training_mode(&mut self, context: ExecutionContext) -> EnableOutcome {
        if self.is_active() {
            return EnableOutcome::AlreadyActive;
        }
        self.mode = SessionMode::Training;
        self.started_at = Some(SystemTime::now());
        self.ended_at = None;
        self.current_context = Some(context);
        self.learned_patterns.clear();
        self.active_guidance = None;
        EnableOutcome::Started
    }

    /// Build and store the selection prompt for a request. Pure state
    /// update; displaying the prompt is the overlay port's job.
    pub fn request_element_selection(
        &mut self,
        request: &AutomationRequest,
    ) -> Result<GuidanceInstruction, TrainingError> {
        if !self.is_active() {
            return Err(TrainingError::NotActive);
        }

        let guidance = GuidanceInstruction::new(request.message_type, request.payload.clone());
        self.active_guidance = Some(guidance.clone());
        self.mode = SessionMode::Guided;
        Ok(guidance)
    }

    /// Turn a demonstrated element into a fresh pattern.
    ///
    /// New patterns start with full confidence and no usage history; the
    /// matching engine's feedback loop takes it from there.
    pub fn learn_pattern(
        &mut self,
        event: ElementSelectedEvent,
    ) -> Result<AutomationPatternData, PatternLearningFailed> {
        if !self.is_active() {
            return Err(PatternLearningFailed {
                reason: LearningFailureReason::SessionNotActive,
            });
        }
        if event.selector.is_empty() {
            return Err(PatternLearningFailed {
                reason: LearningFailureReason::EmptySelector,
            });
        }

        self.pattern_seq += 1;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        let data = AutomationPatternData {
            id: format!("pat-{millis}-{}", self.pattern_seq),
            message_type: event.message_type,
            payload: event.payload,
            selector: event.selector,
            context: event.context,
            confidence: 1.0,
            usage_count: 0,
            successful_executions: 0,
        };

        self.learned_patterns.push(data.clone());
        self.active_guidance = None;
        self.mode = SessionMode::Training;
        Ok(data)
    }

    /// Convert the pending guidance into the learning request that triggers
    /// `learn_pattern` upstream once the element arrives.
    pub fn handle_user_confirmation(&mut self) -> Result<PatternLearningRequested, TrainingError> {
        let Some(guidance) = self.active_guidance.take() else {
            return Err(TrainingError::NoPendingGuidance);
        };

        // An active guidance without a captured context is unreachable:
        // guidance only exists while the session is active.
        let context = self
            .current_context
            .clone()
            .expect("active guidance requires a session context");

        self.mode = SessionMode::Training;
        Ok(PatternLearningRequested {
            message_type: guidance.message_type,
            payload: guidance.payload,
            context,
        })
    }

    /// Drop any pending guidance. Safe to call at any time, in any state;
    /// a second call is a no-op.
    pub fn handle_user_cancellation(&mut self) -> bool {
        let had_guidance = self.active_guidance.take().is_some();
        if self.mode == SessionMode::Guided {
            self.mode = SessionMode::Training;
        }
        had_guidance
    }

    /// `Training → Inactive`, reporting what the session accomplished.
    pub fn end_training_session(&mut self, reason: &str) -> Result<SessionSummary, TrainingError> {
        if !self.is_active() {
            return Err(TrainingError::NotActive);
        }

        let started_at = self
            .started_at
            .expect("active session must have a start time");
        let ended_at = SystemTime::now();
        let summary = SessionSummary {
            started_at,
            ended_at,
            duration: ended_at
                .duration_since(started_at)
                .unwrap_or(Duration::ZERO),
            patterns_learned: self.learned_patterns.len(),
            reason: reason.to_string(),
        };

        self.mode = SessionMode::Inactive;
        self.ended_at = Some(ended_at);
        self.current_context = None;
        self.active_guidance = None;
        self.learned_patterns.clear();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_common::protocol::{MessageType, Payload};

    fn context() -> ExecutionContext {
        ExecutionContext {
            url: "https://app.example.com/signup".to_string(),
            hostname: "app.example.com".to_string(),
            pathname: "/signup".to_string(),
            title: "Sign up".to_string(),
            timestamp: SystemTime::now(),
            page_structure_hash: "abc123".to_string(),
        }
    }

    fn request() -> AutomationRequest {
        AutomationRequest {
            message_type: MessageType::FillText,
            payload: Payload::new().with("elementDescription", "Email address"),
            context: context(),
        }
    }

    fn selection() -> ElementSelectedEvent {
        ElementSelectedEvent {
            message_type: MessageType::FillText,
            selector: "#email".to_string(),
            payload: Payload::new().with("elementDescription", "Email address"),
            context: context(),
        }
    }

    #[test]
    fn enable_is_idempotent() {
        let mut session = TrainingSession::new();
        assert_eq!(session.enable_training_mode(context()), EnableOutcome::Started);
        assert_eq!(
            session.enable_training_mode(context()),
            EnableOutcome::AlreadyActive
        );
        assert!(session.is_active());
    }

    #[test]
    fn learning_while_inactive_fails_and_changes_nothing() {
        let mut session = TrainingSession::new();
        let err = session.learn_pattern(selection()).unwrap_err();
        assert_eq!(err.reason, LearningFailureReason::SessionNotActive);
        assert!(session.learned_patterns().is_empty());
    }

    #[test]
    fn demonstration_produces_a_fresh_pattern() {
        let mut session = TrainingSession::new();
        session.enable_training_mode(context());
        session.request_element_selection(&request()).unwrap();
        assert_eq!(session.mode(), SessionMode::Guided);

        let data = session.learn_pattern(selection()).unwrap();
        assert_eq!(data.confidence, 1.0);
        assert_eq!(data.usage_count, 0);
        assert_eq!(data.selector, "#email");
        assert_eq!(session.learned_patterns().len(), 1);
        assert!(session.active_guidance().is_none());
        assert_eq!(session.mode(), SessionMode::Training);
    }

    #[test]
    fn learned_pattern_ids_are_unique() {
        let mut session = TrainingSession::new();
        session.enable_training_mode(context());
        let a = session.learn_pattern(selection()).unwrap();
        let b = session.learn_pattern(selection()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn confirmation_requires_pending_guidance() {
        let mut session = TrainingSession::new();
        session.enable_training_mode(context());
        assert!(matches!(
            session.handle_user_confirmation(),
            Err(TrainingError::NoPendingGuidance)
        ));

        session.request_element_selection(&request()).unwrap();
        let learning = session.handle_user_confirmation().unwrap();
        assert_eq!(learning.message_type, MessageType::FillText);
        assert_eq!(learning.context.hostname, "app.example.com");
        assert!(session.active_guidance().is_none());
    }

    #[test]
    fn cancellation_is_idempotent() {
        let mut session = TrainingSession::new();
        session.enable_training_mode(context());
        session.request_element_selection(&request()).unwrap();

        assert!(session.handle_user_cancellation());
        assert!(!session.handle_user_cancellation());
        assert_eq!(session.mode(), SessionMode::Training);
    }

    #[test]
    fn ending_reports_the_session_outcome() {
        let mut session = TrainingSession::new();
        session.enable_training_mode(context());
        session.learn_pattern(selection()).unwrap();

        let summary = session.end_training_session("done").unwrap();
        assert_eq!(summary.patterns_learned, 1);
        assert_eq!(summary.reason, "done");
        assert!(!session.is_active());

        assert!(matches!(
            session.end_training_session("again"),
            Err(TrainingError::NotActive)
        ));
    }

    #[test]
    fn selection_request_requires_an_active_session() {
        let mut session = TrainingSession::new();
        assert!(matches!(
            session.request_element_selection(&request()),
            Err(TrainingError::NotActive)
        ));
    }
}

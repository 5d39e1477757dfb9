//! Per-site training session ownership.
//!
//! Sessions for different sites are independent; mutations of the same
//! session (a confirm racing a cancel) serialize on the per-session lock.

use super::guidance::GuidanceInstruction;
use super::session::{
    EnableOutcome, SessionSummary, TrainingError, TrainingSession,
};
use crate::matcher::PatternCache;
use crate::ports::{PatternStorage, UiGuidance};
use mimic_common::protocol::{
    AutomationPatternData, AutomationRequest, ElementSelectedEvent, ExecutionContext,
    PatternLearningRequested,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct TrainingManager {
    storage: Arc<dyn PatternStorage>,
    overlay: Arc<dyn UiGuidance>,
    /// Matching-engine cache handle, invalidated whenever a freshly learned
    /// pattern lands in storage so it is immediately matchable.
    cache: Arc<PatternCache>,
    sessions: Mutex<HashMap<String, Arc<Mutex<TrainingSession>>>>,
}

impl TrainingManager {
    pub fn new(
        storage: Arc<dyn PatternStorage>,
        overlay: Arc<dyn UiGuidance>,
        cache: Arc<PatternCache>,
    ) -> Self {
        Self {
            storage,
            overlay,
            cache,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    async fn session_for(&self, hostname: &str) -> Arc<Mutex<TrainingSession>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(hostname.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TrainingSession::new())))
            .clone()
    }

    pub async fn enable_training_mode(&self, context: ExecutionContext) -> EnableOutcome {
        let session = self.session_for(&context.hostname).await;
        let mut session = session.lock().await;
        let outcome = session.enable_training_mode(context);
        if outcome == EnableOutcome::Started {
            info!(hostname = %session.current_context().map(|c| c.hostname.as_str()).unwrap_or_default(), "training session started");
        }
        outcome
    }

    /// Build the selection prompt and hand it to the overlay.
    pub async fn request_element_selection(
        &self,
        request: &AutomationRequest,
    ) -> Result<GuidanceInstruction, TrainingError> {
        let session = self.session_for(&request.context.hostname).await;
        let mut session = session.lock().await;
        let guidance = session.request_element_selection(request)?;
        self.overlay.display_guidance(&guidance).await?;
        Ok(guidance)
    }

    pub async fn handle_user_confirmation(
        &self,
        hostname: &str,
    ) -> Result<PatternLearningRequested, TrainingError> {
        let session = self.session_for(hostname).await;
        let mut session = session.lock().await;
        let learning = session.handle_user_confirmation()?;
        if let Err(err) = self.overlay.clear_guidance().await {
            warn!(%err, "overlay did not clear after confirmation");
        }
        Ok(learning)
    }

    /// Clearing guidance never fails; an overlay hiccup is logged, not
    /// surfaced.
    pub async fn handle_user_cancellation(&self, hostname: &str) -> bool {
        let session = self.session_for(hostname).await;
        let mut session = session.lock().await;
        let cleared = session.handle_user_cancellation();
        if let Err(err) = self.overlay.clear_guidance().await {
            warn!(%err, "overlay did not clear after cancellation");
        }
        cleared
    }

    /// Record a demonstrated element as a new pattern and persist it.
    /// Storage failures surface: the caller must know the pattern was not
    /// saved.
    pub async fn learn_pattern(
        &self,
        event: ElementSelectedEvent,
    ) -> Result<AutomationPatternData, TrainingError> {
        let session = self.session_for(&event.context.hostname).await;
        let mut session = session.lock().await;
        let data = session.learn_pattern(event)?;

        self.storage.store_pattern(data.clone()).await?;
        self.cache.invalidate(data.message_type).await;
        info!(pattern_id = %data.id, message_type = ?data.message_type, "pattern learned");
        Ok(data)
    }

    pub async fn end_training_session(
        &self,
        hostname: &str,
        reason: &str,
    ) -> Result<SessionSummary, TrainingError> {
        let session = self.session_for(hostname).await;
        let mut session = session.lock().await;
        let summary = session.end_training_session(reason)?;
        info!(
            hostname,
            patterns = summary.patterns_learned,
            secs = summary.duration.as_secs(),
            "training session ended"
        );
        Ok(summary)
    }

    pub async fn is_training_active(&self, hostname: &str) -> bool {
        let session = self.session_for(hostname).await;
        let session = session.lock().await;
        session.is_active()
    }
}

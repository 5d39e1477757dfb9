//! The pattern matching engine.
//!
//! Given an automation request it fetches candidates (cached per message
//! type), scores and ranks them, delegates execution of the best one, and
//! folds the outcome back into the pattern's statistics. When nothing is
//! acceptable it signals the caller to fall back to training.

use crate::config::EngineConfig;
use crate::matcher::cache::PatternCache;
use crate::matcher::health::{
    ExecutionHistory, ExecutionRecord, FleetReport, PerformanceReport, RecentTrend,
    RecommendedAction, TypeHealth,
};
use crate::pattern::{AutomationPattern, ExecutionReport, valid_for_context};
use crate::ports::{ActionExecutor, PatternStorage, StorageError};
use mimic_common::protocol::{
    AutomationPatternData, AutomationRequest, ExecutionContext, MessageType,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Unknown pattern: {0}")]
    PatternNotFound(String),
}

/// How strongly the engine endorses acting on a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRecommendation {
    High,
    Medium,
    Low,
    Risky,
}

impl MatchRecommendation {
    fn classify(overall_score: f64, confidence: f64) -> Self {
        if overall_score >= 0.8 && confidence >= 1.0 {
            MatchRecommendation::High
        } else if overall_score >= 0.7 {
            MatchRecommendation::Medium
        } else if overall_score >= 0.6 {
            MatchRecommendation::Low
        } else {
            MatchRecommendation::Risky
        }
    }
}

/// One scored candidate. Ephemeral; produced per matching attempt and never
/// persisted.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub pattern: AutomationPatternData,
    /// Pattern confidence at match time.
    pub confidence: f64,
    pub context_score: f64,
    pub payload_similarity: f64,
    pub overall_score: f64,
    pub recommendation: MatchRecommendation,
}

/// Result of driving one request end to end.
#[derive(Debug)]
pub enum EngineOutcome {
    Executed(ExecutionReport),
    /// No acceptable pattern; the caller should start a training session.
    TrainingRequired,
}

pub struct MatchingEngine {
    storage: Arc<dyn PatternStorage>,
    executor: Arc<dyn ActionExecutor>,
    cache: Arc<PatternCache>,
    histories: Mutex<HashMap<String, Arc<Mutex<ExecutionHistory>>>>,
    config: EngineConfig,
}

impl MatchingEngine {
    pub fn new(
        storage: Arc<dyn PatternStorage>,
        executor: Arc<dyn ActionExecutor>,
        config: EngineConfig,
    ) -> Self {
        Self {
            storage,
            executor,
            cache: Arc::new(PatternCache::new(config.cache_ttl())),
            histories: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Shared handle to the candidate cache, for collaborators that write
    /// patterns outside the engine (training) and must invalidate.
    pub fn cache(&self) -> Arc<PatternCache> {
        Arc::clone(&self.cache)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Candidates of the request's type, fetched through the cache. A
    /// storage read failure degrades to "no patterns available".
    async fn patterns_for_type(&self, message_type: MessageType) -> Vec<AutomationPatternData> {
        if let Some(cached) = self.cache.get(message_type).await {
            debug!(?message_type, count = cached.len(), "pattern cache hit");
            return cached;
        }

        match self.storage.retrieve_patterns_by_type(message_type).await {
            Ok(patterns) => {
                self.cache.put(message_type, patterns.clone()).await;
                patterns
            }
            Err(err) => {
                warn!(?message_type, %err, "pattern fetch failed, matching with no candidates");
                Vec::new()
            }
        }
    }

    /// Score every candidate of the request's type.
    ///
    /// Low-scoring matches are included on purpose; acceptability is the
    /// caller's decision and diagnostics want the full distribution.
    pub async fn find_matching_patterns(&self, request: &AutomationRequest) -> Vec<PatternMatch> {
        let candidates = self.patterns_for_type(request.message_type).await;

        candidates
            .into_iter()
            .map(|data| {
                let pattern = AutomationPattern::new(data);
                let criteria = pattern.evaluate_match(request);
                let data = pattern.into_data();
                PatternMatch {
                    confidence: data.confidence,
                    context_score: criteria.context_compatibility,
                    payload_similarity: criteria.payload_similarity,
                    overall_score: criteria.overall_score,
                    recommendation: MatchRecommendation::classify(
                        criteria.overall_score,
                        data.confidence,
                    ),
                    pattern: data,
                }
            })
            .collect()
    }

    fn is_match_acceptable(&self, candidate: &PatternMatch, context: &ExecutionContext) -> bool {
        candidate.overall_score >= self.config.match_threshold
            && valid_for_context(&candidate.pattern, context)
    }

    /// Pick the best acceptable match, or `None` as the explicit signal to
    /// fall back to training.
    ///
    /// Ties go to higher confidence, then to lower usage count, so an
    /// underused-but-valid pattern still gets exercised.
    pub fn select_best_pattern(
        &self,
        matches: &[PatternMatch],
        context: &ExecutionContext,
    ) -> Option<PatternMatch> {
        matches
            .iter()
            .filter(|m| self.is_match_acceptable(m, context))
            .max_by(|a, b| {
                a.overall_score
                    .partial_cmp(&b.overall_score)
                    .unwrap_or(Ordering::Equal)
                    .then(
                        a.confidence
                            .partial_cmp(&b.confidence)
                            .unwrap_or(Ordering::Equal),
                    )
                    .then(b.pattern.usage_count.cmp(&a.pattern.usage_count))
            })
            .cloned()
    }

    /// Drive one request end to end: match, select, execute, record.
    pub async fn execute_request(
        &self,
        request: &AutomationRequest,
    ) -> Result<EngineOutcome, EngineError> {
        let matches = self.find_matching_patterns(request).await;
        let Some(best) = self.select_best_pattern(&matches, &request.context) else {
            debug!(
                message_type = ?request.message_type,
                candidates = matches.len(),
                "no acceptable pattern, falling back to training"
            );
            return Ok(EngineOutcome::TrainingRequired);
        };

        debug!(
            pattern_id = %best.pattern.id,
            score = best.overall_score,
            "executing best match"
        );

        let mut pattern = AutomationPattern::new(best.pattern.clone());
        let report = pattern
            .execute(request, self.executor.as_ref(), self.config.execution_timeout())
            .await;

        self.update_pattern_statistics(&best.pattern.id, &report)
            .await?;
        Ok(EngineOutcome::Executed(report))
    }

    async fn history_for(&self, pattern_id: &str) -> Arc<Mutex<ExecutionHistory>> {
        let mut histories = self.histories.lock().await;
        histories
            .entry(pattern_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ExecutionHistory::new(self.config.history_window))))
            .clone()
    }

    /// The system's sole feedback loop: fold one execution outcome into the
    /// pattern's persisted statistics. Called exactly once per attempt.
    ///
    /// Serialized per pattern id: the counters are re-read from storage
    /// under the per-pattern lock, so two concurrent executions of the same
    /// pattern fold both increments instead of racing a read-modify-write.
    pub async fn update_pattern_statistics(
        &self,
        pattern_id: &str,
        report: &ExecutionReport,
    ) -> Result<(), EngineError> {
        if !report.counts_as_usage() {
            debug!(%pattern_id, "attempt never reached the executor, statistics unchanged");
            return Ok(());
        }

        let history = self.history_for(pattern_id).await;
        let mut history = history.lock().await;

        let data = self
            .storage
            .retrieve_pattern(pattern_id)
            .await?
            .ok_or_else(|| EngineError::PatternNotFound(pattern_id.to_string()))?;

        let mut pattern = AutomationPattern::new(data);
        pattern.record_outcome(report.succeeded());
        let data = pattern.data();

        let usage_write = self
            .storage
            .update_pattern_usage(pattern_id, data.usage_count, data.successful_executions)
            .await;
        let confidence_write = self
            .storage
            .update_pattern_confidence(pattern_id, data.confidence)
            .await;

        // A partially applied write must not stay cached until TTL expiry,
        // so the entry is dropped before either error surfaces.
        self.cache.invalidate(data.message_type).await;
        usage_write?;
        confidence_write?;

        history.push(ExecutionRecord {
            success: report.succeeded(),
            duration: report.duration(),
            at: SystemTime::now(),
        });

        Ok(())
    }

    /// Success rate, timing and trend for one pattern, plus what to do
    /// about it.
    pub async fn analyze_pattern_performance(
        &self,
        pattern_id: &str,
    ) -> Result<PerformanceReport, EngineError> {
        let data = self
            .storage
            .retrieve_pattern(pattern_id)
            .await?
            .ok_or_else(|| EngineError::PatternNotFound(pattern_id.to_string()))?;

        let history = self.history_for(pattern_id).await;
        let history = history.lock().await;

        let lifetime_rate = data.success_rate();
        let recent_trend = match history.recent_success_rate() {
            Some(recent) if recent > lifetime_rate + self.config.trend_band => {
                RecentTrend::Improving
            }
            Some(recent) if recent < lifetime_rate - self.config.trend_band => {
                RecentTrend::Declining
            }
            _ => RecentTrend::Stable,
        };

        let now = SystemTime::now();
        let pattern = AutomationPattern::new(data);
        let recommended_action = if pattern.data().usage_count == 0
            && pattern.data().age_days(now) > self.config.delete_after_days
        {
            RecommendedAction::Delete
        } else if pattern.should_be_retrained(now, self.config.stale_after_days) {
            RecommendedAction::Retrain
        } else {
            RecommendedAction::Keep
        };

        Ok(PerformanceReport {
            pattern_id: pattern_id.to_string(),
            success_rate: lifetime_rate,
            average_execution_time: history.average_duration(),
            recent_trend,
            recommended_action,
        })
    }

    /// Fleet-health view for one context: coverage per message type, which
    /// types need a demonstration, and which patterns have gone stale.
    pub async fn pattern_recommendations(&self, context: &ExecutionContext) -> FleetReport {
        let patterns = match self.storage.retrieve_patterns_by_context(context).await {
            Ok(patterns) => patterns,
            Err(err) => {
                warn!(%err, "context fetch failed, reporting empty fleet");
                Vec::new()
            }
        };

        let now = SystemTime::now();
        let mut by_type: HashMap<MessageType, TypeHealth> = HashMap::new();
        let mut health_sum = 0.0;
        let mut stale_patterns = Vec::new();

        for data in &patterns {
            health_sum += data.success_rate() * (data.confidence / crate::pattern::CONFIDENCE_CAP);

            let pattern = AutomationPattern::new(data.clone());
            let stale = pattern.should_be_retrained(now, self.config.stale_after_days);
            if stale {
                stale_patterns.push(data.id.clone());
            }

            let acceptable = !stale
                && pattern.context_compatibility(context) >= self.config.match_threshold;

            let entry = by_type.entry(data.message_type).or_insert(TypeHealth {
                pattern_count: 0,
                average_confidence: 0.0,
                has_acceptable: false,
            });
            entry.pattern_count += 1;
            entry.average_confidence += data.confidence;
            entry.has_acceptable |= acceptable;
        }

        for health in by_type.values_mut() {
            health.average_confidence /= health.pattern_count as f64;
        }

        // Every supported action kind is checked, so a type with no pattern
        // at all for this context is flagged too.
        let needs_training: Vec<MessageType> = MessageType::ALL
            .into_iter()
            .filter(|t| !by_type.get(t).is_some_and(|h| h.has_acceptable))
            .collect();

        FleetReport {
            overall_health: if patterns.is_empty() {
                0.0
            } else {
                health_sum / patterns.len() as f64
            },
            by_type,
            needs_training,
            stale_patterns,
        }
    }

    /// Delete every pattern that fails the staleness policy. Returns the
    /// deleted ids.
    pub async fn cleanup_stale_patterns(&self) -> Result<Vec<String>, EngineError> {
        let patterns = self.storage.export_patterns().await?;
        let now = SystemTime::now();
        let mut deleted = Vec::new();

        for data in patterns {
            let message_type = data.message_type;
            let id = data.id.clone();
            let pattern = AutomationPattern::new(data);
            if pattern.should_be_retrained(now, self.config.stale_after_days) {
                self.storage.delete_pattern(&id).await?;
                self.cache.invalidate(message_type).await;
                deleted.push(id);
            }
        }

        if !deleted.is_empty() {
            info!(count = deleted.len(), "removed stale patterns");
        }
        Ok(deleted)
    }

    pub async fn export_patterns(&self) -> Result<Vec<AutomationPatternData>, EngineError> {
        Ok(self.storage.export_patterns().await?)
    }

    /// Bulk import. The whole cache is dropped afterwards since any type
    /// may have changed.
    pub async fn import_patterns(
        &self,
        patterns: Vec<AutomationPatternData>,
    ) -> Result<(), EngineError> {
        self.storage.import_patterns(patterns).await?;
        self.cache.clear().await;
        Ok(())
    }
}

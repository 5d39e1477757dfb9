//! The learned-pattern entity.
//!
//! An `AutomationPattern` wraps a stored record and owns the scoring,
//! execution and confidence bookkeeping for it. Scoring is deterministic:
//! the same pattern state and request always produce the same score.

use crate::ports::{ActionError, ActionExecutor};
use mimic_common::protocol::{
    AutomationPatternData, AutomationRequest, ExecutionContext, MessageType,
};
use mimic_common::similarity::{path_similarity, string_similarity};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

pub const CONFIDENCE_FLOOR: f64 = 0.1;
pub const CONFIDENCE_CAP: f64 = 2.0;

// Slow climb, fast fall: one failure should make the engine cautious faster
// than one success makes it complacent.
const SUCCESS_LEARNING_RATE: f64 = 0.05;
const FAILURE_PENALTY: f64 = 0.1;

// Context compatibility weights. Hostname dominates: a pattern learned on a
// different site is almost never transferable.
const HOSTNAME_WEIGHT: f64 = 0.5;
const PATH_WEIGHT: f64 = 0.3;
const STRUCTURE_WEIGHT: f64 = 0.2;

// Overall match score weights.
const CONTEXT_WEIGHT: f64 = 0.4;
const PAYLOAD_WEIGHT: f64 = 0.3;
const CONFIDENCE_WEIGHT: f64 = 0.2;
const TYPE_WEIGHT: f64 = 0.1;

const MIN_USAGE_FOR_RELIABILITY: u64 = 3;
const RETRAIN_CONFIDENCE_FLOOR: f64 = 0.3;

/// Sub-scores computed for one pattern against one request.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingCriteria {
    pub message_type_match: bool,
    pub payload_similarity: f64,
    pub context_compatibility: f64,
    pub confidence_threshold: f64,
    pub overall_score: f64,
}

/// Coarse trust classification derived from outcome history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityLevel {
    High,
    Medium,
    Low,
    Unreliable,
}

/// Why an execution attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The current page is not the one the pattern was learned on.
    ContextMismatch,
    ElementNotFound,
    ElementNotActionable,
    Timeout,
    Backend(String),
}

impl From<ActionError> for FailureReason {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::ElementNotFound(_) => FailureReason::ElementNotFound,
            ActionError::ElementNotActionable(_) => FailureReason::ElementNotActionable,
            ActionError::Timeout => FailureReason::Timeout,
            ActionError::Backend(msg) => FailureReason::Backend(msg),
        }
    }
}

/// Typed failure result for an execution attempt. Never propagated as an
/// error: one bad pattern must not abort a batch of other candidates.
#[derive(Debug, Clone, Error)]
#[error("Pattern {pattern_id} failed to execute {message_type:?}: {reason:?}")]
pub struct PatternExecutionFailed {
    pub pattern_id: String,
    pub message_type: MessageType,
    pub reason: FailureReason,
    pub duration: Duration,
}

/// Outcome of one execution attempt.
#[derive(Debug, Clone)]
pub enum ExecutionReport {
    Executed {
        pattern_id: String,
        message_type: MessageType,
        duration: Duration,
        message: Option<String>,
    },
    Failed(PatternExecutionFailed),
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        matches!(self, ExecutionReport::Executed { .. })
    }

    pub fn duration(&self) -> Duration {
        match self {
            ExecutionReport::Executed { duration, .. } => *duration,
            ExecutionReport::Failed(failed) => failed.duration,
        }
    }

    /// Whether this attempt reached the action executor at all. A context
    /// mismatch is rejected before any DOM work happens and must not count
    /// against the pattern's statistics.
    pub fn counts_as_usage(&self) -> bool {
        match self {
            ExecutionReport::Executed { .. } => true,
            ExecutionReport::Failed(failed) => failed.reason != FailureReason::ContextMismatch,
        }
    }
}

/// Execution gate, stricter than match scoring: performing an action needs
/// near-certainty that this is the same page, not just a similar one.
pub fn valid_for_context(pattern: &AutomationPatternData, current: &ExecutionContext) -> bool {
    pattern.context.hostname == current.hostname
        && pattern.context.page_structure_hash == current.page_structure_hash
}

pub struct AutomationPattern {
    data: AutomationPatternData,
}

impl AutomationPattern {
    pub fn new(data: AutomationPatternData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &AutomationPatternData {
        &self.data
    }

    pub fn into_data(self) -> AutomationPatternData {
        self.data
    }

    /// Score this pattern against a request.
    ///
    /// A message-type mismatch short-circuits the overall score to 0: a
    /// pattern can never match a different action kind, no matter how
    /// similar the page looks.
    pub fn evaluate_match(&self, request: &AutomationRequest) -> MatchingCriteria {
        let message_type_match = self.data.message_type == request.message_type;
        let payload_similarity = self.payload_similarity(request);
        let context_compatibility = self.context_compatibility(&request.context);
        let confidence_threshold = self.data.confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CAP);

        let overall_score = if message_type_match {
            CONTEXT_WEIGHT * context_compatibility
                + PAYLOAD_WEIGHT * payload_similarity
                + CONFIDENCE_WEIGHT * (confidence_threshold / CONFIDENCE_CAP)
                + TYPE_WEIGHT
        } else {
            0.0
        };

        MatchingCriteria {
            message_type_match,
            payload_similarity,
            context_compatibility,
            confidence_threshold,
            overall_score,
        }
    }

    fn payload_similarity(&self, request: &AutomationRequest) -> f64 {
        if self.data.payload.is_empty() && request.payload.is_empty() {
            return 1.0;
        }

        let description = string_similarity(
            self.data.payload.element_description(),
            request.payload.element_description(),
        );
        let value = string_similarity(
            self.data.payload.target_value(),
            request.payload.target_value(),
        );
        (description + value) / 2.0
    }

    /// Weighted page similarity between the learned context and the current
    /// one. Also used by the fleet-health view, so it must stay in step with
    /// `evaluate_match`.
    pub fn context_compatibility(&self, current: &ExecutionContext) -> f64 {
        let learned = &self.data.context;
        let hostname = if learned.hostname == current.hostname {
            1.0
        } else {
            0.0
        };
        let path = path_similarity(&learned.pathname, &current.pathname);
        let structure = if learned.page_structure_hash == current.page_structure_hash {
            1.0
        } else {
            0.0
        };

        HOSTNAME_WEIGHT * hostname + PATH_WEIGHT * path + STRUCTURE_WEIGHT * structure
    }

    pub fn is_good_match(&self, criteria: &MatchingCriteria, threshold: f64) -> bool {
        criteria.message_type_match && criteria.overall_score >= threshold
    }

    pub fn is_valid_for_context(&self, current: &ExecutionContext) -> bool {
        valid_for_context(&self.data, current)
    }

    /// Run this pattern through the action executor, bounded by `timeout`.
    ///
    /// Statistics are updated on the in-memory record: success bumps both
    /// counters, any executor failure or timeout bumps only the usage count.
    /// A context mismatch returns a failure report without touching the
    /// counters, since no DOM attempt was made.
    pub async fn execute(
        &mut self,
        request: &AutomationRequest,
        executor: &dyn ActionExecutor,
        timeout: Duration,
    ) -> ExecutionReport {
        let started = Instant::now();

        if !self.is_valid_for_context(&request.context) {
            return ExecutionReport::Failed(PatternExecutionFailed {
                pattern_id: self.data.id.clone(),
                message_type: self.data.message_type,
                reason: FailureReason::ContextMismatch,
                duration: started.elapsed(),
            });
        }

        let attempt = tokio::time::timeout(
            timeout,
            executor.perform(&self.data.selector, self.data.message_type, &request.payload),
        )
        .await;

        match attempt {
            Ok(Ok(outcome)) => {
                self.record_outcome(true);
                ExecutionReport::Executed {
                    pattern_id: self.data.id.clone(),
                    message_type: self.data.message_type,
                    duration: started.elapsed(),
                    message: outcome.message,
                }
            }
            Ok(Err(err)) => {
                self.record_outcome(false);
                ExecutionReport::Failed(PatternExecutionFailed {
                    pattern_id: self.data.id.clone(),
                    message_type: self.data.message_type,
                    reason: err.into(),
                    duration: started.elapsed(),
                })
            }
            Err(_elapsed) => {
                self.record_outcome(false);
                ExecutionReport::Failed(PatternExecutionFailed {
                    pattern_id: self.data.id.clone(),
                    message_type: self.data.message_type,
                    reason: FailureReason::Timeout,
                    duration: started.elapsed(),
                })
            }
        }
    }

    /// Fold one execution outcome into the counters and confidence.
    pub fn record_outcome(&mut self, success: bool) {
        self.data.usage_count += 1;
        if success {
            self.data.successful_executions += 1;
        }
        self.update_confidence(success);
        debug_assert!(self.data.successful_executions <= self.data.usage_count);
    }

    /// Reinforcement step. Success gains shrink as confidence approaches the
    /// cap; failures subtract a flat penalty down to the floor.
    pub fn update_confidence(&mut self, success: bool) {
        let confidence = &mut self.data.confidence;
        if success {
            *confidence = (*confidence
                + SUCCESS_LEARNING_RATE * (1.0 - *confidence / CONFIDENCE_CAP))
                .min(CONFIDENCE_CAP);
        } else {
            *confidence = (*confidence - FAILURE_PENALTY).max(CONFIDENCE_FLOOR);
        }
    }

    /// Classify trust from success rate and sample size. Fewer than three
    /// uses is insufficient evidence either way, so those stay `Medium`.
    pub fn reliability_level(&self) -> ReliabilityLevel {
        if self.data.usage_count < MIN_USAGE_FOR_RELIABILITY {
            return ReliabilityLevel::Medium;
        }

        let rate = self.data.success_rate();
        if rate < 0.5 {
            ReliabilityLevel::Unreliable
        } else if rate < 0.7 {
            ReliabilityLevel::Low
        } else if rate < 0.9 {
            ReliabilityLevel::Medium
        } else {
            ReliabilityLevel::High
        }
    }

    /// A pattern needs retraining when its history says it fails, its
    /// confidence has collapsed, or it has sat unused past the configured
    /// horizon (`stale_after_days`, supplied by engine config the same way
    /// `is_good_match` takes its threshold).
    pub fn should_be_retrained(&self, now: SystemTime, stale_after_days: f64) -> bool {
        if self.reliability_level() == ReliabilityLevel::Unreliable {
            return true;
        }
        if self.data.confidence <= RETRAIN_CONFIDENCE_FLOOR {
            return true;
        }
        self.data.usage_count == 0 && self.data.age_days(now) > stale_after_days
    }
}

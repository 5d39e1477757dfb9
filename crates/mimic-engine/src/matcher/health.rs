//! Per-pattern performance analysis and fleet-health reporting types.

use mimic_common::protocol::MessageType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

/// Direction of a pattern's recent success rate relative to its lifetime
/// average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecentTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Keep,
    Retrain,
    Delete,
}

/// Analysis output for a single pattern.
#[derive(Debug, Clone)]
pub struct PerformanceReport {
    pub pattern_id: String,
    pub success_rate: f64,
    /// Mean duration over retained history; `None` before the first
    /// recorded execution.
    pub average_execution_time: Option<Duration>,
    pub recent_trend: RecentTrend,
    pub recommended_action: RecommendedAction,
}

/// Health summary for one message type within a context.
#[derive(Debug, Clone)]
pub struct TypeHealth {
    pub pattern_count: usize,
    pub average_confidence: f64,
    pub has_acceptable: bool,
}

/// Fleet-wide view for one context: which action kinds are covered, which
/// need a demonstration, and which patterns have gone stale.
#[derive(Debug, Clone)]
pub struct FleetReport {
    /// Mean confidence-weighted success rate across all patterns for the
    /// context; 0 when there are none.
    pub overall_health: f64,
    pub by_type: HashMap<MessageType, TypeHealth>,
    pub needs_training: Vec<MessageType>,
    pub stale_patterns: Vec<String>,
}

/// One remembered execution attempt.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRecord {
    pub success: bool,
    pub duration: Duration,
    pub at: SystemTime,
}

/// Bounded ring of recent executions for one pattern. Aggregate counters
/// live on the pattern record; this retains the per-attempt detail trend
/// analysis needs.
#[derive(Debug)]
pub struct ExecutionHistory {
    records: VecDeque<ExecutionRecord>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, record: ExecutionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn average_duration(&self) -> Option<Duration> {
        if self.records.is_empty() {
            return None;
        }
        let total: Duration = self.records.iter().map(|r| r.duration).sum();
        Some(total / self.records.len() as u32)
    }

    /// Success rate over the retained window; `None` while empty.
    pub fn recent_success_rate(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let successes = self.records.iter().filter(|r| r.success).count();
        Some(successes as f64 / self.records.len() as f64)
    }
}

use async_trait::async_trait;
use mimic_common::protocol::{AutomationPatternData, ExecutionContext, MessageType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Pattern not found: {0}")]
    NotFound(String),
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence port for learned patterns.
///
/// Read failures are treated by the engine as "no patterns available";
/// write failures are surfaced so callers know persistence did not happen.
#[async_trait]
pub trait PatternStorage: Send + Sync {
    async fn store_pattern(&self, pattern: AutomationPatternData) -> Result<(), StorageError>;

    async fn retrieve_pattern(&self, id: &str)
    -> Result<Option<AutomationPatternData>, StorageError>;

    async fn retrieve_patterns_by_type(
        &self,
        message_type: MessageType,
    ) -> Result<Vec<AutomationPatternData>, StorageError>;

    /// Patterns learned on the same site as the given context.
    async fn retrieve_patterns_by_context(
        &self,
        context: &ExecutionContext,
    ) -> Result<Vec<AutomationPatternData>, StorageError>;

    async fn update_pattern_usage(
        &self,
        id: &str,
        usage_count: u64,
        successful_executions: u64,
    ) -> Result<(), StorageError>;

    async fn update_pattern_confidence(&self, id: &str, confidence: f64)
    -> Result<(), StorageError>;

    async fn delete_pattern(&self, id: &str) -> Result<(), StorageError>;

    async fn export_patterns(&self) -> Result<Vec<AutomationPatternData>, StorageError>;

    async fn import_patterns(
        &self,
        patterns: Vec<AutomationPatternData>,
    ) -> Result<(), StorageError>;
}

use super::storage::{PatternStorage, StorageError};
use async_trait::async_trait;
use mimic_common::protocol::{AutomationPatternData, ExecutionContext, MessageType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory pattern store. Default backing store for sessions without a
/// persistence backend, and the storage double used by the test suites.
#[derive(Clone, Default)]
pub struct MemoryPatternStorage {
    patterns: Arc<Mutex<HashMap<String, AutomationPatternData>>>,
}

impl MemoryPatternStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PatternStorage for MemoryPatternStorage {
    async fn store_pattern(&self, pattern: AutomationPatternData) -> Result<(), StorageError> {
        let mut patterns = self.patterns.lock().unwrap();
        patterns.insert(pattern.id.clone(), pattern);
        Ok(())
    }

    async fn retrieve_pattern(
        &self,
        id: &str,
    ) -> Result<Option<AutomationPatternData>, StorageError> {
        let patterns = self.patterns.lock().unwrap();
        Ok(patterns.get(id).cloned())
    }

    async fn retrieve_patterns_by_type(
        &self,
        message_type: MessageType,
    ) -> Result<Vec<AutomationPatternData>, StorageError> {
        let patterns = self.patterns.lock().unwrap();
        Ok(patterns
            .values()
            .filter(|p| p.message_type == message_type)
            .cloned()
            .collect())
    }

    async fn retrieve_patterns_by_context(
        &self,
        context: &ExecutionContext,
    ) -> Result<Vec<AutomationPatternData>, StorageError> {
        let patterns = self.patterns.lock().unwrap();
        Ok(patterns
            .values()
            .filter(|p| p.context.hostname == context.hostname)
            .cloned()
            .collect())
    }

    async fn update_pattern_usage(
        &self,
        id: &str,
        usage_count: u64,
        successful_executions: u64,
    ) -> Result<(), StorageError> {
        let mut patterns = self.patterns.lock().unwrap();
        let pattern = patterns
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        pattern.usage_count = usage_count;
        pattern.successful_executions = successful_executions;
        Ok(())
    }

    async fn update_pattern_confidence(
        &self,
        id: &str,
        confidence: f64,
    ) -> Result<(), StorageError> {
        let mut patterns = self.patterns.lock().unwrap();
        let pattern = patterns
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        pattern.confidence = confidence;
        Ok(())
    }

    async fn delete_pattern(&self, id: &str) -> Result<(), StorageError> {
        let mut patterns = self.patterns.lock().unwrap();
        patterns
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn export_patterns(&self) -> Result<Vec<AutomationPatternData>, StorageError> {
        let patterns = self.patterns.lock().unwrap();
        let mut all: Vec<_> = patterns.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn import_patterns(
        &self,
        imported: Vec<AutomationPatternData>,
    ) -> Result<(), StorageError> {
        let mut patterns = self.patterns.lock().unwrap();
        for pattern in imported {
            patterns.insert(pattern.id.clone(), pattern);
        }
        Ok(())
    }
}

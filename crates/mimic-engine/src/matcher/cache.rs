//! Per-message-type pattern cache with TTL and write invalidation.

use mimic_common::protocol::{AutomationPatternData, MessageType};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CacheEntry {
    patterns: Vec<AutomationPatternData>,
    fetched_at: Instant,
}

/// Candidate cache owned by the matching engine.
///
/// Entries are keyed by message type. A write touching a type invalidates
/// that type's entry; untouched entries expire after the TTL. Reads of
/// different types only contend on the shared read lock.
pub struct PatternCache {
    ttl: Duration,
    entries: RwLock<HashMap<MessageType, CacheEntry>>,
}

impl PatternCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached candidates for a type, or `None` on miss or expiry.
    pub async fn get(&self, message_type: MessageType) -> Option<Vec<AutomationPatternData>> {
        let entries = self.entries.read().await;
        let entry = entries.get(&message_type)?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.patterns.clone())
    }

    pub async fn put(&self, message_type: MessageType, patterns: Vec<AutomationPatternData>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            message_type,
            CacheEntry {
                patterns,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for one type. Must be called on every write affecting
    /// that type so subsequent reads observe the write.
    pub async fn invalidate(&self, message_type: MessageType) {
        let mut entries = self.entries.write().await;
        entries.remove(&message_type);
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }
}

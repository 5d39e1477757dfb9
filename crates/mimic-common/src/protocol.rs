//! Shared protocol types for the pattern engine.
//!
//! These are the records exchanged between the matching engine, the training
//! session, and the external ports (storage, action executor, UI guidance).
//! Wire framing is owned by the transport layer; everything here is plain
//! serde data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// The category of UI action a pattern performs.
///
/// Closed set on purpose: instruction generation, payload extraction and
/// action dispatch all match exhaustively on this, so adding an action kind
/// is a compile-checked change rather than a string comparison falling
/// through to a default arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "FillTextRequested")]
    FillText,
    #[serde(rename = "ClickElementRequested")]
    ClickElement,
    #[serde(rename = "SelectOptionRequested")]
    SelectOption,
    #[serde(rename = "ToggleCheckboxRequested")]
    ToggleCheckbox,
}

impl MessageType {
    /// Every supported action kind, for coverage scans over the full set.
    pub const ALL: [MessageType; 4] = [
        MessageType::FillText,
        MessageType::ClickElement,
        MessageType::SelectOption,
        MessageType::ToggleCheckbox,
    ];

    /// Short human-readable name of the action, used in guidance text.
    pub fn action_name(&self) -> &'static str {
        match self {
            MessageType::FillText => "fill",
            MessageType::ClickElement => "click",
            MessageType::SelectOption => "select",
            MessageType::ToggleCheckbox => "toggle",
        }
    }
}

/// Free-form key/value payload describing what an action does.
///
/// Genuinely heterogeneous across message types, so it stays an open map;
/// the salient fields used for similarity scoring get typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(pub HashMap<String, serde_json::Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Human description of the target element ("Email address field").
    pub fn element_description(&self) -> &str {
        self.get_str("elementDescription").unwrap_or_default()
    }

    /// The value the action carries (text to type, option to pick).
    pub fn target_value(&self) -> &str {
        self.get_str("value").unwrap_or_default()
    }

    /// Logical name of the target ("email", "submit").
    pub fn target_name(&self) -> &str {
        self.get_str("targetName").unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single DOM element summary used for structural fingerprinting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class: String,
}

/// Number of leading DOM nodes folded into the structure hash.
const STRUCTURE_HASH_PREFIX: usize = 50;

/// Order-preserving FNV-1a fingerprint of a bounded prefix of the page's
/// element tag/id/class triples.
///
/// A cheap pre-filter for context compatibility, not a cryptographic hash;
/// collisions are acceptable and expected to be rare for meaningfully
/// different pages.
pub fn page_structure_hash(nodes: &[DomNode]) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    let mut fold = |bytes: &[u8]| {
        for b in bytes {
            hash ^= u64::from(*b);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash ^= u64::from(b'|');
        hash = hash.wrapping_mul(FNV_PRIME);
    };

    for node in nodes.iter().take(STRUCTURE_HASH_PREFIX) {
        fold(node.tag.as_bytes());
        fold(node.id.as_bytes());
        fold(node.class.as_bytes());
    }

    format!("{hash:016x}")
}

/// Immutable snapshot of the page a pattern was learned on or a request
/// arrived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub url: String,
    pub hostname: String,
    pub pathname: String,
    pub title: String,
    pub timestamp: SystemTime,
    pub page_structure_hash: String,
}

impl ExecutionContext {
    /// Capture a context snapshot, deriving hostname and pathname from the
    /// page URL and fingerprinting the supplied DOM summary.
    pub fn capture(url: &str, title: &str, nodes: &[DomNode]) -> Result<Self, url::ParseError> {
        let parsed = url::Url::parse(url)?;
        Ok(Self {
            url: url.to_string(),
            hostname: parsed.host_str().unwrap_or_default().to_string(),
            pathname: parsed.path().to_string(),
            title: title.to_string(),
            timestamp: SystemTime::now(),
            page_structure_hash: page_structure_hash(nodes),
        })
    }
}

/// A learned automation pattern, as persisted by the storage port.
///
/// Mutated only through the engine's usage/confidence updates; `id`,
/// `message_type`, `payload` and `selector` are fixed at creation. A changed
/// page invalidates a pattern rather than mutating its selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationPatternData {
    pub id: String,
    pub message_type: MessageType,
    pub payload: Payload,
    pub selector: String,
    pub context: ExecutionContext,
    pub confidence: f64,
    pub usage_count: u64,
    pub successful_executions: u64,
}

impl AutomationPatternData {
    /// Fraction of executions that succeeded; 0 for a never-used pattern.
    pub fn success_rate(&self) -> f64 {
        debug_assert!(self.successful_executions <= self.usage_count);
        if self.usage_count == 0 {
            0.0
        } else {
            self.successful_executions as f64 / self.usage_count as f64
        }
    }

    /// Age of the pattern relative to `now`, based on its capture timestamp.
    pub fn age_days(&self, now: SystemTime) -> f64 {
        now.duration_since(self.context.timestamp)
            .map(|d| d.as_secs_f64() / 86_400.0)
            .unwrap_or(0.0)
    }
}

/// An incoming ask: "perform this kind of action, described by this payload,
/// on the page described by this context".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRequest {
    pub message_type: MessageType,
    pub payload: Payload,
    pub context: ExecutionContext,
}

/// Emitted by the UI layer once the human has clicked the demonstration
/// target during training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSelectedEvent {
    pub message_type: MessageType,
    pub selector: String,
    pub payload: Payload,
    pub context: ExecutionContext,
}

/// Produced by a confirmed guidance; what ultimately triggers pattern
/// learning upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternLearningRequested {
    pub message_type: MessageType,
    pub payload: Payload,
    pub context: ExecutionContext,
}

use async_trait::async_trait;
use mimic_common::protocol::{MessageType, Payload};
use thiserror::Error;

/// Distinct failure reasons matter here: "element missing" usually means the
/// page changed, while "not actionable" points at the pattern itself.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Element not actionable: {0}")]
    ElementNotActionable(String),
    #[error("Action timed out")]
    Timeout,
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result of a successfully performed DOM action.
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    pub message: Option<String>,
}

/// The DOM-level execution port. One capability: perform an action against
/// a selector with the payload's parameters.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn perform(
        &self,
        selector: &str,
        action: MessageType,
        payload: &Payload,
    ) -> Result<ActionOutcome, ActionError>;
}

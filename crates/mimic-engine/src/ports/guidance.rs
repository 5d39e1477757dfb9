use crate::training::guidance::GuidanceInstruction;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuidanceError {
    #[error("Guidance overlay unavailable: {0}")]
    Unavailable(String),
}

/// The training overlay port.
///
/// The session owes the overlay at most one pending guidance at a time; the
/// overlay owes exactly one confirm or cancel back per guidance shown.
#[async_trait]
pub trait UiGuidance: Send + Sync {
    async fn display_guidance(&self, guidance: &GuidanceInstruction) -> Result<(), GuidanceError>;

    async fn clear_guidance(&self) -> Result<(), GuidanceError>;

    async fn highlight_element(&self, selector: &str) -> Result<(), GuidanceError>;
}

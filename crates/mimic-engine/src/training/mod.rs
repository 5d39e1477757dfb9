pub mod guidance;
pub mod manager;
pub mod session;

pub use guidance::GuidanceInstruction;
pub use manager::TrainingManager;
pub use session::{
    EnableOutcome, LearningFailureReason, PatternLearningFailed, SessionMode, SessionSummary,
    TrainingError, TrainingSession,
};

//! External collaborator ports.
//!
//! The engine only ever talks to persistence, the DOM execution layer and
//! the training overlay through these traits; the real implementations live
//! behind the transport boundary.

pub mod executor;
pub mod guidance;
pub mod memory;
pub mod storage;

pub use executor::{ActionError, ActionExecutor, ActionOutcome};
pub use guidance::{GuidanceError, UiGuidance};
pub use memory::MemoryPatternStorage;
pub use storage::{PatternStorage, StorageError};

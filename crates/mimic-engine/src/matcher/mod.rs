pub mod cache;
pub mod engine;
pub mod health;

pub use cache::PatternCache;
pub use engine::{EngineError, EngineOutcome, MatchRecommendation, MatchingEngine, PatternMatch};
pub use health::{
    ExecutionHistory, ExecutionRecord, FleetReport, PerformanceReport, RecentTrend,
    RecommendedAction, TypeHealth,
};

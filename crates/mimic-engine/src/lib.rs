pub mod config;
pub mod matcher;
pub mod pattern;
pub mod ports;
pub mod training;

pub use mimic_common::protocol;
pub use mimic_common::similarity;

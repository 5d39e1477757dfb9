pub mod protocol;
pub mod similarity;

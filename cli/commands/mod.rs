pub mod completion;
pub mod config;
pub mod embed;
pub mod merge;
pub mod plan;
pub mod search;
pub mod stats;
pub mod tree;

pub mod cli;
pub mod config;
pub mod core;
pub mod extractors;
pub mod utils;

pub use config::Config;
pub use core::{
    Channel, Outcome, Pipeline, QualityConstraint, ResolutionEngine, ResolutionRequest, ResolutionResult,
    UsageLedger, ValidatedResult,
};
pub use extractors::StrategyRegistry;

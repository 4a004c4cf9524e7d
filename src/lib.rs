pub mod cache;
pub mod config;
pub mod domain;
pub mod efficiency;
pub mod error;
pub mod repo;
pub mod state;
pub mod telemetry;

pub use error::{EfficiencyError, EfficiencyResult};

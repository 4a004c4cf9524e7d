//! Savings metrics, their roll-ups and the cached read paths over them.

pub mod aggregator;
pub mod calculator;
pub mod service;
pub mod summarizer;

pub use service::{EfficiencyService, Invalidation, DEFAULT_MAX_PAGE_SIZE};

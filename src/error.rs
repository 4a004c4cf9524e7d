use thiserror::Error;

/// Errors returned by [`crate::efficiency::EfficiencyService`].
///
/// Cache failures never appear here; only the store and input validation
/// can fail an operation. A missing building is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum EfficiencyError {
    #[error("store operation failed: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),
}

pub type EfficiencyResult<T> = Result<T, EfficiencyError>;

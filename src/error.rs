// ============================================================================
// Market Errors
// Error taxonomy shared by every market operation
// ============================================================================

use thiserror::Error;

/// Errors raised by a [`StateStore`](crate::interfaces::StateStore)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A guarded key changed between read and commit
    #[error("version conflict on key {key}: expected {expected:?}, found {found:?}")]
    Conflict {
        key: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    /// The backing store is unavailable or refused the operation
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Top-level error for market operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corrupted record under {key}: {reason}")]
    StateCorruption { key: String, reason: String },

    #[error("market did not converge after {iterations} iterations")]
    ConvergenceFailure { iterations: u64 },

    /// Another writer committed first; the whole operation may be retried
    #[error("concurrent modification of {key}")]
    Conflict { key: String },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl MarketError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        MarketError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        MarketError::InvalidArgument(reason.into())
    }

    pub fn corrupted(key: impl Into<String>, reason: impl ToString) -> Self {
        MarketError::StateCorruption {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether re-running the same operation can succeed without changing inputs
    pub fn is_retriable(&self) -> bool {
        matches!(self, MarketError::Conflict { .. })
    }
}

impl From<StoreError> for MarketError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { key, .. } => MarketError::Conflict { key },
            other => MarketError::Store(other),
        }
    }
}

/// Result type alias for market operations
pub type MarketResult<T> = Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            MarketError::not_found("consumer", "c9").to_string(),
            "consumer not found: c9"
        );
        assert_eq!(
            MarketError::ConvergenceFailure { iterations: 50 }.to_string(),
            "market did not converge after 50 iterations"
        );
    }

    #[test]
    fn test_conflict_is_retriable() {
        let err: MarketError = StoreError::Conflict {
            key: "MarketState".to_string(),
            expected: Some(1),
            found: Some(2),
        }
        .into();

        assert!(err.is_retriable());
        assert!(!MarketError::invalid("price must be positive").is_retriable());
        assert!(!MarketError::from(StoreError::Backend("down".to_string())).is_retriable());
    }
}

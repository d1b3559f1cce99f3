use crate::models::geo_point::PointDecodeError;

/// Errors surfaced by the tracking core.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Absent, deleted and foreign-owned resources all map here.
    #[error("Resource not found or not accessible")]
    NotFoundOrForbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transaction failed during {step}: {source}")]
    Transaction {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Decode(#[from] PointDecodeError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrackingError {
    /// Wraps a store error with the transactional step it happened in.
    pub fn step(step: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| TrackingError::Transaction { step, source }
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;

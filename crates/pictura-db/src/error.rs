use pictura_core::PipelineError;
use thiserror::Error;

/// Metadata store errors
#[derive(Debug, Error)]
pub enum DbError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// The database could not be reached or the pool is exhausted.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => DbError::Unavailable(err.to_string()),
            _ => DbError::Query(err.to_string()),
        }
    }
}

impl From<DbError> for PipelineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => PipelineError::Conflict(msg),
            other => PipelineError::TransientInfra(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_stays_permanent() {
        let err: PipelineError = DbError::Conflict("idx_uploads_url".into()).into();
        assert!(matches!(err, PipelineError::Conflict(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn pool_timeout_is_transient() {
        let db_err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(db_err, DbError::Unavailable(_)));
        let err: PipelineError = db_err.into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn row_not_found_is_a_query_error() {
        let db_err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(db_err, DbError::Query(_)));
    }
}

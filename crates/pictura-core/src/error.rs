//! Pipeline error taxonomy
//!
//! Every stage of the ingestion pipeline returns a [`PipelineError`]. Each variant
//! carries its own classification: permanent errors remove the message from the
//! queue without redelivery, recoverable errors send it back for another attempt.
//! The consumer reads the classification directly instead of catching errors
//! across layers.

use std::fmt;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like duplicate deliveries
    Debug,
    /// Warning level - for rejected input that will never succeed
    Warn,
    /// Error level - for infrastructure faults and unexpected failures
    Error,
}

/// Whether a failed job may succeed if delivered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retrying cannot change the outcome; dead-letter the message.
    Permanent,
    /// The fault may clear up; requeue the message.
    Transient,
}

/// Which validation rule rejected an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Type,
    Size,
    Dimension,
    Corruption,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationKind::Type => write!(f, "type"),
            ValidationKind::Size => write!(f, "size"),
            ValidationKind::Dimension => write!(f, "dimension"),
            ValidationKind::Corruption => write!(f, "corruption"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Malformed job: {0}")]
    MalformedJob(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Validation failed ({kind}): {reason}")]
    ValidationFailed { kind: ValidationKind, reason: String },

    #[error("Infrastructure unavailable: {0}")]
    TransientInfra(String),

    #[error("Duplicate record: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    UnknownInternal(String),
}

/// Result type for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn validation(kind: ValidationKind, reason: impl Into<String>) -> Self {
        PipelineError::ValidationFailed {
            kind,
            reason: reason.into(),
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            PipelineError::MalformedJob(_)
            | PipelineError::NotFound(_)
            | PipelineError::ValidationFailed { .. }
            | PipelineError::Conflict(_) => FailureClass::Permanent,
            PipelineError::TransientInfra(_) | PipelineError::UnknownInternal(_) => {
                FailureClass::Transient
            }
        }
    }

    /// Check if this error is recoverable (should be retried)
    pub fn is_recoverable(&self) -> bool {
        self.class() == FailureClass::Transient
    }

    /// Machine-readable error code for logs and dead-letter annotations
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::MalformedJob(_) => "MALFORMED_JOB",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::ValidationFailed { kind, .. } => match kind {
                ValidationKind::Type => "VALIDATION_TYPE",
                ValidationKind::Size => "VALIDATION_SIZE",
                ValidationKind::Dimension => "VALIDATION_DIMENSION",
                ValidationKind::Corruption => "VALIDATION_CORRUPTION",
            },
            PipelineError::TransientInfra(_) => "TRANSIENT_INFRA",
            PipelineError::Conflict(_) => "CONFLICT",
            PipelineError::UnknownInternal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::Conflict(_) => LogLevel::Debug,
            PipelineError::MalformedJob(_)
            | PipelineError::NotFound(_)
            | PipelineError::ValidationFailed { .. } => LogLevel::Warn,
            PipelineError::TransientInfra(_) | PipelineError::UnknownInternal(_) => {
                LogLevel::Error
            }
        }
    }

    /// The validation rule that failed, if this is a validation error.
    pub fn validation_kind(&self) -> Option<ValidationKind> {
        match self {
            PipelineError::ValidationFailed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::MalformedJob(err.to_string())
    }
}

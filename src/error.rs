use thiserror::Error;

/// Result type for cage operations
pub type CageResult<T> = Result<T, CageError>;

/// Error taxonomy for the cage controller
///
/// Configuration and Data errors are rejected before a run begins; a
/// Communication error aborts the active run after a best-effort zeroing
/// of the outputs.
#[derive(Debug, Clone, Error)]
pub enum CageError {
    /// Invalid offset, rate of change or unit supplied before start
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Hardware write or connect failure, including write timeouts
    #[error("communication error: {0}")]
    Communication(String),

    /// Malformed dataset rejected before a run can start
    #[error("data error: {0}")]
    Data(String),

    /// Unit label not in the supported set
    ///
    /// The previous controller returned -1 here and kept computing with
    /// it. That silently corrupted every setpoint downstream, so this is
    /// now a hard failure.
    #[error("unrecognized unit '{0}'")]
    UnrecognizedUnit(String),
}

impl CageError {
    pub fn config(msg: impl Into<String>) -> Self {
        CageError::Configuration(msg.into())
    }

    pub fn comm(msg: impl Into<String>) -> Self {
        CageError::Communication(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        CageError::Data(msg.into())
    }
}

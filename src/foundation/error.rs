/// Convenience result type used across playout.
pub type PlayoutResult<T> = Result<T, PlayoutError>;

/// Top-level error taxonomy used by pipeline and producer APIs.
#[derive(thiserror::Error, Debug)]
pub enum PlayoutError {
    /// Invalid user-provided configuration or playlist data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A producer could not acquire what it needs to create frames.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// A broken pipeline invariant: render before initialize, render after end of stream,
    /// double initialize, overlapping renders.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Errors while producing or compositing pixels.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlayoutError {
    /// Build a [`PlayoutError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PlayoutError::Initialization`] value.
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Build a [`PlayoutError::ContractViolation`] value.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    /// Build a [`PlayoutError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`PlayoutError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error reports a caller or implementation contract violation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

//! Domain error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// An invariant does not hold, e.g. a runtime config whose default lies
    /// outside its own bounds.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Text did not name a known stance, facing or faction.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

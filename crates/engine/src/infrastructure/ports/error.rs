//! Error types for port operations.

use chibibot_domain::{Facing, Stance};

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

/// Catalog lookup failures. Each names the first part of the tuple that
/// has no assets.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid operator name ({0})")]
    UnknownOperator(String),

    #[error("invalid skin name ({0})")]
    UnknownSkin(String),

    #[error("skin does not have a '{0}' stance")]
    MissingStance(Stance),

    #[error("{stance} skin does not have facing direction ({facing})")]
    MissingFacing { stance: Stance, facing: Facing },

    #[error("skin does not have animation ({0})")]
    MissingAnimation(String),

    #[error("failed to load catalog: {0}")]
    Load(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("chat connection failed: {0}")]
    Connect(String),
    #[error("chat source is closed")]
    Closed,
    #[error("no chat source connected for channel {0}")]
    NotConnected(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("channel lookup failed: {0}")]
    Lookup(String),
}

use chibibot_domain::DomainError;

use crate::infrastructure::ports::{CatalogError, ChatError, DirectoryError};
use crate::use_cases::operator_state::OperatorError;

use super::bridge::BridgeError;

/// Errors from room lifecycle and room-level operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("channel {0} does not exist")]
    ChannelNotFound(String),
    #[error("room {0} is not running")]
    RoomNotFound(String),
    #[error("dependency failed: {0}")]
    Dependency(String),
    #[error(transparent)]
    Operator(#[from] OperatorError),
    #[error("invalid runtime config: {0}")]
    Config(#[from] DomainError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl From<ChatError> for RoomError {
    fn from(e: ChatError) -> Self {
        Self::Dependency(e.to_string())
    }
}

impl From<DirectoryError> for RoomError {
    fn from(e: DirectoryError) -> Self {
        Self::Dependency(e.to_string())
    }
}

impl From<CatalogError> for RoomError {
    fn from(e: CatalogError) -> Self {
        Self::Operator(OperatorError::Catalog(e))
    }
}

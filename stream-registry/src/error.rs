use thiserror::Error;

use crate::types::{StreamId, StreamState};

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid input for stream {id}: {reason}")]
    InvalidInput { id: StreamId, reason: String },
    #[error("stream {id} not found")]
    NotFound { id: StreamId },
    #[error("stream {id} is already {state:?}")]
    InvalidState { id: StreamId, state: StreamState },
}

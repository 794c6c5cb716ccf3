//! # Engine Error Types

use thiserror::Error;
use tilecast_core::SceneError;

use crate::config::ConfigError;

/// Errors surfaced to the host by the engine crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A render request was malformed or out of range. No session started.
    #[error("invalid render config: {0}")]
    InvalidConfig(#[from] SceneError),

    /// The other end of the render channel is gone.
    #[error("render channel closed")]
    TransportFailure,

    /// The engine's own configuration was unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An engine thread could not be started.
    #[error("failed to spawn {thread}: {message}")]
    Spawn {
        /// Name of the thread.
        thread: String,
        /// OS error text.
        message: String,
    },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

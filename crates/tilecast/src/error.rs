//! # Host Error Types

use thiserror::Error;
use tilecast_engine::EngineError;
use tilecast_protocol::{SessionId, TileRect};

/// Errors raised while driving a render on the host side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// A tile reached past the canvas edge.
    #[error("tile {rect:?} does not fit a {width}x{height} canvas")]
    TileOutOfBounds {
        /// The tile's rectangle.
        rect: TileRect,
        /// Canvas width.
        width: u32,
        /// Canvas height.
        height: u32,
    },

    /// The engine ended the session without finishing it.
    #[error("session {session} failed: {reason}")]
    SessionFailed {
        /// The failed session.
        session: SessionId,
        /// Reason given by the engine.
        reason: String,
    },

    /// The engine refused the request.
    #[error("session {session} rejected: {reason}")]
    Rejected {
        /// The refused session.
        session: SessionId,
        /// Reason given by the engine.
        reason: String,
    },

    /// `Done` arrived but some pixels were never painted.
    #[error("session {session} finished with {missing} unpainted pixels")]
    Incomplete {
        /// The session.
        session: SessionId,
        /// Pixels never painted.
        missing: u64,
    },

    /// Engine or channel failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

//! # Channel Messages
//!
//! ```text
//!   HOST                                   ENGINE
//!    │ ── Render { session, config } ───────> │
//!    │ <──────────────────────────── Ready ── │  (once, at startup)
//!    │ <─────────────────── Tile(result) ──── │  (any order)
//!    │ <─────────────────── Tile(result) ──── │
//!    │ <─────────────────── Done { session } ─│  (exactly once, last)
//!    │ ── Shutdown ─────────────────────────> │
//! ```
//!
//! Every engine message except `Ready` names the session it belongs to.

use tilecast_core::SceneConfig;

use crate::tile::{SessionId, TileResult};

/// Message type tags, the first byte of every encoded frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Engine -> Host: the engine is up.
    Ready = 0x01,
    /// Engine -> Host: one finished tile.
    Tile = 0x02,
    /// Engine -> Host: every tile of a session was delivered.
    Done = 0x03,
    /// Engine -> Host: a session ended with an error.
    Failed = 0x04,
    /// Engine -> Host: a request was refused before it started.
    Rejected = 0x05,
    /// Host -> Engine: start rendering.
    Render = 0x10,
    /// Host -> Engine: stop the engine.
    Shutdown = 0x11,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        match tag {
            0x01 => Ok(Self::Ready),
            0x02 => Ok(Self::Tile),
            0x03 => Ok(Self::Done),
            0x04 => Ok(Self::Failed),
            0x05 => Ok(Self::Rejected),
            0x10 => Ok(Self::Render),
            0x11 => Ok(Self::Shutdown),
            other => Err(other),
        }
    }
}

/// Host -> Engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostMessage {
    /// Render `config`, abandoning whatever session is in flight.
    Render {
        /// Id the engine must tag its output with.
        session: SessionId,
        /// What to draw.
        config: SceneConfig,
    },
    /// Stop accepting work and exit.
    Shutdown,
}

impl HostMessage {
    /// Tag of this message.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Render { .. } => MessageType::Render,
            Self::Shutdown => MessageType::Shutdown,
        }
    }
}

/// Engine -> Host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineMessage {
    /// The engine is running and accepts requests.
    Ready,
    /// A finished tile.
    Tile(TileResult),
    /// The last tile of `session` was delivered.
    Done {
        /// Session that finished.
        session: SessionId,
    },
    /// `session` ended without producing every tile.
    Failed {
        /// Session that failed.
        session: SessionId,
        /// Human-readable cause.
        reason: String,
    },
    /// A request was refused; no session was started for it.
    Rejected {
        /// Id carried by the refused request.
        session: SessionId,
        /// Human-readable cause.
        reason: String,
    },
}

impl EngineMessage {
    /// Session this message is about; `None` for `Ready`.
    #[must_use]
    pub const fn session(&self) -> Option<SessionId> {
        match self {
            Self::Ready => None,
            Self::Tile(tile) => Some(tile.session),
            Self::Done { session }
            | Self::Failed { session, .. }
            | Self::Rejected { session, .. } => Some(*session),
        }
    }

    /// True for the messages that end a session's stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. } | Self::Rejected { .. })
    }

    /// Tag of this message.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Ready => MessageType::Ready,
            Self::Tile(_) => MessageType::Tile,
            Self::Done { .. } => MessageType::Done,
            Self::Failed { .. } => MessageType::Failed,
            Self::Rejected { .. } => MessageType::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for tag in [0x01u8, 0x02, 0x03, 0x04, 0x05, 0x10, 0x11] {
            let ty = MessageType::try_from(tag).unwrap();
            assert_eq!(ty as u8, tag);
        }
        assert_eq!(MessageType::try_from(0x06), Err(0x06));
        assert_eq!(MessageType::try_from(0x00), Err(0x00));
    }

    #[test]
    fn test_session_and_terminal() {
        assert_eq!(EngineMessage::Ready.session(), None);
        assert!(!EngineMessage::Ready.is_terminal());

        let done = EngineMessage::Done { session: SessionId(4) };
        assert_eq!(done.session(), Some(SessionId(4)));
        assert!(done.is_terminal());

        let failed = EngineMessage::Failed { session: SessionId(5), reason: "x".into() };
        assert!(failed.is_terminal());
        assert_eq!(failed.message_type(), MessageType::Failed);
    }
}

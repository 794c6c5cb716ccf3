//! # Render Channel
//!
//! Two FIFO queues between a host and an engine, one per direction.
//!
//! ```text
//!  RenderHost                               EngineEndpoint
//!  ──────────                               ──────────────
//!  request() ── HostMessage ──[bounded]───> recv()
//!  recv()    <── EngineMessage ─[bounded]── send()
//! ```
//!
//! The host assigns session ids and validates configs before anything is
//! sent. Messages belonging to a session the host has since replaced are
//! filtered out on receipt, so after `request` returns the host only ever
//! sees output for the newest session.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tilecast_core::SceneConfig;
use tilecast_protocol::{EngineMessage, HostMessage, SessionId};

use crate::error::{EngineError, EngineResult};

/// Creates a connected host/engine pair with `capacity` slots per direction.
#[must_use]
pub fn render_channel(capacity: usize) -> (RenderHost, EngineEndpoint) {
    let (request_tx, request_rx) = bounded(capacity);
    let (event_tx, event_rx) = bounded(capacity);
    (
        RenderHost { requests: request_tx, events: event_rx, last_session: SessionId(0), current: None },
        EngineEndpoint { requests: request_rx, events: event_tx },
    )
}

/// Host side of the render channel.
#[derive(Debug)]
pub struct RenderHost {
    requests: Sender<HostMessage>,
    events: Receiver<EngineMessage>,
    last_session: SessionId,
    current: Option<SessionId>,
}

impl RenderHost {
    /// Validates `config` and asks the engine to render it, replacing any
    /// request still in flight.
    ///
    /// Fails with `InvalidConfig` before sending anything if the config is
    /// out of range.
    pub fn request(&mut self, config: SceneConfig) -> EngineResult<SessionId> {
        config.validate()?;
        let session = self.last_session.next();
        self.send(HostMessage::Render { session, config })?;
        Ok(session)
    }

    /// Builds a config from untyped inputs and requests it.
    pub fn request_raw(
        &mut self,
        width: u32,
        height: u32,
        sky_index: u8,
        scene_index: u8,
        hue1: [i64; 3],
        hue2: [i64; 3],
    ) -> EngineResult<SessionId> {
        let config = SceneConfig::from_raw(width, height, sky_index, scene_index, hue1, hue2)?;
        self.request(config)
    }

    /// Sends a message as-is, without validation.
    ///
    /// For hosts relaying decoded frames; a bad request sent this way is
    /// answered with `Rejected`.
    pub fn send(&mut self, message: HostMessage) -> EngineResult<()> {
        let session = match &message {
            HostMessage::Render { session, .. } => Some(*session),
            HostMessage::Shutdown => None,
        };
        self.requests.send(message).map_err(|_| EngineError::TransportFailure)?;
        if let Some(session) = session {
            self.last_session = self.last_session.max(session);
            self.current = Some(session);
        }
        Ok(())
    }

    /// Asks the engine to stop.
    pub fn shutdown(&mut self) -> EngineResult<()> {
        self.send(HostMessage::Shutdown)
    }

    /// Most recently requested session.
    #[inline]
    #[must_use]
    pub const fn current_session(&self) -> Option<SessionId> {
        self.current
    }

    /// Blocks for the next message of the current session (or `Ready`).
    pub fn recv(&self) -> EngineResult<EngineMessage> {
        loop {
            let message = self.events.recv().map_err(|_| EngineError::TransportFailure)?;
            if self.is_current(&message) {
                return Ok(message);
            }
        }
    }

    /// Like [`RenderHost::recv`], giving up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> EngineResult<Option<EngineMessage>> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            match self.events.recv_deadline(deadline) {
                Ok(message) if self.is_current(&message) => return Ok(Some(message)),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(EngineError::TransportFailure),
            }
        }
    }

    /// Next message of any session, stale ones included.
    pub fn recv_unfiltered_timeout(&self, timeout: Duration) -> EngineResult<Option<EngineMessage>> {
        match self.events.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::TransportFailure),
        }
    }

    /// Returns a waiting message of the current session, if any.
    pub fn try_recv(&self) -> EngineResult<Option<EngineMessage>> {
        loop {
            match self.events.try_recv() {
                Ok(message) if self.is_current(&message) => return Ok(Some(message)),
                Ok(_) => {}
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(EngineError::TransportFailure),
            }
        }
    }

    fn is_current(&self, message: &EngineMessage) -> bool {
        match message.session() {
            None => true,
            Some(session) => self.current == Some(session),
        }
    }
}

/// Engine side of the render channel.
#[derive(Debug)]
pub struct EngineEndpoint {
    requests: Receiver<HostMessage>,
    events: Sender<EngineMessage>,
}

impl EngineEndpoint {
    /// Queue of incoming host messages.
    #[inline]
    #[must_use]
    pub const fn requests(&self) -> &Receiver<HostMessage> {
        &self.requests
    }

    /// Queue of outgoing engine messages.
    #[inline]
    #[must_use]
    pub const fn events(&self) -> &Sender<EngineMessage> {
        &self.events
    }

    /// Blocks for the next host message.
    pub fn recv(&self) -> EngineResult<HostMessage> {
        self.requests.recv().map_err(|_| EngineError::TransportFailure)
    }

    /// Sends a message to the host, taking ownership of any pixels.
    pub fn send(&self, message: EngineMessage) -> EngineResult<()> {
        self.events.send(message).map_err(|_| EngineError::TransportFailure)
    }
}

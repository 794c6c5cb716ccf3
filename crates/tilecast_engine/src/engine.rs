//! # Render State Machine
//!
//! ```text
//!                begin_render(a)
//!   ┌──────┐ ───────────────────> ┌───────────────┐ ──┐ begin_render(b)
//!   │ Idle │                      │ Rendering(a)  │   │ (a is abandoned)
//!   └──────┘ <─────────────────── └───────────────┘ <─┘
//!       last tile accepted / fail_session / cancel
//! ```
//!
//! [`RenderEngine`] only keeps books: which session is live, which tiles
//! are left to hand out and which results still count. It spawns nothing
//! and sends nothing; the dispatcher thread drives it.
//!
//! Every transition bumps the engine's *epoch*. Tasks are stamped with the
//! epoch they were issued in, so results from an abandoned session are
//! recognised even if a later session reuses its id.

use tilecast_core::SceneConfig;
use tilecast_protocol::{SessionId, TileResult};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::session::{RenderSession, RenderedTile, TileTask};

/// Coarse engine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No session is live.
    Idle,
    /// The given session is live.
    Rendering(SessionId),
}

/// What to do with a returned tile.
#[derive(Debug, PartialEq, Eq)]
pub enum TileVerdict {
    /// The tile belongs to a session that is no longer live. Drop it.
    Stale(TileResult),
    /// Forward the tile to the host.
    Deliver {
        /// The tile.
        tile: TileResult,
        /// Set when this was the session's last tile; the engine is now idle
        /// and `Done` must follow the tile.
        finished: Option<SessionId>,
    },
}

/// The engine's session bookkeeping.
#[derive(Debug)]
pub struct RenderEngine {
    config: EngineConfig,
    session: Option<RenderSession>,
    epoch: u64,
}

impl RenderEngine {
    /// Creates an idle engine.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config, session: None, epoch: 0 }
    }

    /// The engine configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.session
            .as_ref()
            .map_or(EngineState::Idle, |s| EngineState::Rendering(s.id()))
    }

    /// Live session id, if any.
    #[must_use]
    pub fn active_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(RenderSession::id)
    }

    /// The live session.
    #[must_use]
    pub fn session(&self) -> Option<&RenderSession> {
        self.session.as_ref()
    }

    /// Current epoch. Tasks stamped with any other epoch are stale.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Starts `id`, abandoning the live session if there is one.
    ///
    /// On an invalid config nothing changes and the error is returned.
    /// On success returns the id of the abandoned session.
    pub fn begin_render(
        &mut self,
        id: SessionId,
        config: SceneConfig,
    ) -> EngineResult<Option<SessionId>> {
        config.validate()?;

        self.epoch += 1;
        let session = RenderSession::new(
            id,
            self.epoch,
            config,
            self.config.quality(),
            self.config.tile_size,
        );
        tracing::debug!(
            "Session {} started: {}x{} {}/{} in {} tiles",
            id,
            config.width,
            config.height,
            config.sky.name(),
            config.scene.name(),
            session.total_tiles()
        );

        let abandoned = self.session.replace(session).map(|old| old.id());
        if let Some(old) = abandoned {
            tracing::debug!("Session {} abandoned for {}", old, id);
        }
        Ok(abandoned)
    }

    /// Next tile of the live session, if any are left to hand out.
    pub fn next_task(&mut self) -> Option<TileTask> {
        self.session.as_mut()?.next_task()
    }

    /// Decides what happens to a returned tile.
    pub fn accept_tile(&mut self, rendered: RenderedTile) -> TileVerdict {
        let RenderedTile { epoch, tile } = rendered;
        let Some(session) = self.session.as_mut() else {
            return TileVerdict::Stale(tile);
        };
        if epoch != self.epoch || session.epoch() != epoch || session.id() != tile.session {
            return TileVerdict::Stale(tile);
        }

        session.record(&tile);
        if !session.is_complete() {
            return TileVerdict::Deliver { tile, finished: None };
        }

        let id = session.id();
        tracing::debug!(
            "Session {} complete: {} pixels, {} substituted",
            id,
            session.pixels_delivered(),
            session.pixels_substituted()
        );
        self.end();
        TileVerdict::Deliver { tile, finished: Some(id) }
    }

    /// True if `epoch` is the live session's epoch.
    #[must_use]
    pub fn is_current(&self, epoch: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.epoch() == epoch) && epoch == self.epoch
    }

    /// Ends the live session with an error. Returns false if `id` is not
    /// the live session.
    pub fn fail_session(&mut self, id: SessionId) -> bool {
        if self.active_session() != Some(id) {
            return false;
        }
        self.end();
        true
    }

    /// Ends the live session without completing it.
    pub fn cancel(&mut self) -> Option<SessionId> {
        let id = self.active_session()?;
        self.end();
        Some(id)
    }

    fn end(&mut self) {
        self.session = None;
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use tilecast_core::SceneError;

    fn engine() -> RenderEngine {
        RenderEngine::new(EngineConfig { tile_size: 8, ..EngineConfig::preview() })
    }

    fn scene(width: u32, height: u32) -> SceneConfig {
        SceneConfig { width, height, ..SceneConfig::default() }
    }

    fn run_all(engine: &mut RenderEngine) -> Vec<TileVerdict> {
        let mut tasks = Vec::new();
        while let Some(task) = engine.next_task() {
            tasks.push(task);
        }
        tasks.iter().map(|t| engine.accept_tile(t.render())).collect()
    }

    #[test]
    fn test_idle_to_rendering_to_idle() {
        let mut e = engine();
        assert_eq!(e.state(), EngineState::Idle);
        assert_eq!(e.begin_render(SessionId(1), scene(16, 8)).unwrap(), None);
        assert_eq!(e.state(), EngineState::Rendering(SessionId(1)));

        let verdicts = run_all(&mut e);
        assert_eq!(verdicts.len(), 2);
        assert!(matches!(verdicts[0], TileVerdict::Deliver { finished: None, .. }));
        assert!(matches!(
            verdicts[1],
            TileVerdict::Deliver { finished: Some(SessionId(1)), .. }
        ));
        assert_eq!(e.state(), EngineState::Idle);
        assert!(e.next_task().is_none());
    }

    #[test]
    fn test_invalid_config_leaves_session_untouched() {
        let mut e = engine();
        e.begin_render(SessionId(1), scene(16, 16)).unwrap();
        let epoch = e.epoch();

        let err = e.begin_render(SessionId(2), scene(0, 16)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidConfig(SceneError::EmptyImage { width: 0, height: 16 })
        );
        assert_eq!(e.active_session(), Some(SessionId(1)));
        assert_eq!(e.epoch(), epoch);
    }

    #[test]
    fn test_new_request_abandons_old() {
        let mut e = engine();
        e.begin_render(SessionId(1), scene(16, 16)).unwrap();
        let old_task = e.next_task().unwrap();

        assert_eq!(e.begin_render(SessionId(2), scene(8, 8)).unwrap(), Some(SessionId(1)));
        assert!(matches!(e.accept_tile(old_task.render()), TileVerdict::Stale(_)));

        let new_task = e.next_task().unwrap();
        assert_eq!(new_task.session, SessionId(2));
        assert!(e.next_task().is_none());
        assert!(matches!(
            e.accept_tile(new_task.render()),
            TileVerdict::Deliver { finished: Some(SessionId(2)), .. }
        ));
    }

    #[test]
    fn test_reused_id_does_not_accept_old_tiles() {
        let mut e = engine();
        e.begin_render(SessionId(5), scene(8, 8)).unwrap();
        let old_task = e.next_task().unwrap();
        e.begin_render(SessionId(5), scene(8, 8)).unwrap();
        assert!(matches!(e.accept_tile(old_task.render()), TileVerdict::Stale(_)));
        assert_eq!(e.session().unwrap().completed_tiles(), 0);
    }

    #[test]
    fn test_fail_and_cancel() {
        let mut e = engine();
        assert!(!e.fail_session(SessionId(1)));
        assert_eq!(e.cancel(), None);

        e.begin_render(SessionId(1), scene(16, 16)).unwrap();
        let task = e.next_task().unwrap();
        assert!(!e.fail_session(SessionId(2)));
        assert!(e.fail_session(SessionId(1)));
        assert_eq!(e.state(), EngineState::Idle);
        assert!(!e.is_current(task.epoch));
        assert!(matches!(e.accept_tile(task.render()), TileVerdict::Stale(_)));

        e.begin_render(SessionId(3), scene(16, 16)).unwrap();
        assert_eq!(e.cancel(), Some(SessionId(3)));
        assert_eq!(e.state(), EngineState::Idle);
    }

    #[test]
    fn test_usable_after_failure() {
        let mut e = engine();
        e.begin_render(SessionId(1), scene(8, 8)).unwrap();
        e.fail_session(SessionId(1));
        e.begin_render(SessionId(2), scene(8, 8)).unwrap();
        let verdicts = run_all(&mut e);
        assert!(matches!(
            verdicts.last(),
            Some(TileVerdict::Deliver { finished: Some(SessionId(2)), .. })
        ));
    }
}

//! # Render Sessions
//!
//! A session is one accepted render request: its config, the shader built
//! from it, the tiles still to hand out and how many have come back.

use std::collections::VecDeque;
use std::sync::Arc;

use tilecast_core::{PixelShader, Quality, SceneConfig};
use tilecast_protocol::{PixelBuffer, SessionId, TileRect, TileResult};

use crate::tiler;

/// One tile of work, self-contained so any worker can run it.
#[derive(Clone, Debug)]
pub struct TileTask {
    /// Session the tile belongs to.
    pub session: SessionId,
    /// Engine epoch the task was issued in.
    pub epoch: u64,
    /// Region to shade.
    pub rect: TileRect,
    shader: Arc<PixelShader>,
}

impl TileTask {
    /// Shades every pixel of the rectangle, row-major.
    #[must_use]
    pub fn render(&self) -> RenderedTile {
        let rect = self.rect;
        let mut pixels = PixelBuffer::with_capacity(rect.width, rect.height);
        let mut substituted = 0u32;
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                let shaded = self.shader.shade(x, y);
                substituted += u32::from(shaded.substituted);
                pixels.push(shaded.color);
            }
        }
        debug_assert!(pixels.is_complete());

        if substituted > 0 {
            tracing::warn!(
                "Session {}: {} non-finite pixels replaced in tile at ({}, {})",
                self.session,
                substituted,
                rect.x,
                rect.y
            );
        }

        RenderedTile {
            epoch: self.epoch,
            tile: TileResult { session: self.session, rect, pixels, substituted },
        }
    }
}

/// A finished task on its way back to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedTile {
    /// Epoch copied from the task.
    pub epoch: u64,
    /// The pixels.
    pub tile: TileResult,
}

/// Live state of one request.
#[derive(Debug)]
pub struct RenderSession {
    id: SessionId,
    epoch: u64,
    config: SceneConfig,
    shader: Arc<PixelShader>,
    pending: VecDeque<TileRect>,
    total_tiles: usize,
    completed_tiles: usize,
    pixels_delivered: u64,
    pixels_substituted: u64,
}

impl RenderSession {
    /// Plans the tiles of an already-validated config.
    #[must_use]
    pub fn new(
        id: SessionId,
        epoch: u64,
        config: SceneConfig,
        quality: Quality,
        tile_size: u32,
    ) -> Self {
        let pending: VecDeque<TileRect> =
            tiler::plan(config.width, config.height, tile_size).into();
        Self {
            id,
            epoch,
            shader: Arc::new(PixelShader::new(&config, quality)),
            config,
            total_tiles: pending.len(),
            pending,
            completed_tiles: 0,
            pixels_delivered: 0,
            pixels_substituted: 0,
        }
    }

    /// Session id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Epoch the session was started in.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The request's config.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Hands out the next tile, or `None` once every tile is issued.
    pub fn next_task(&mut self) -> Option<TileTask> {
        self.pending.pop_front().map(|rect| TileTask {
            session: self.id,
            epoch: self.epoch,
            rect,
            shader: Arc::clone(&self.shader),
        })
    }

    /// Counts a returned tile.
    pub fn record(&mut self, tile: &TileResult) {
        self.completed_tiles += 1;
        self.pixels_delivered += tile.rect.area();
        self.pixels_substituted += u64::from(tile.substituted);
    }

    /// Tiles in the plan.
    #[inline]
    #[must_use]
    pub const fn total_tiles(&self) -> usize {
        self.total_tiles
    }

    /// Tiles not yet handed out.
    #[inline]
    #[must_use]
    pub fn pending_tiles(&self) -> usize {
        self.pending.len()
    }

    /// Tiles returned so far.
    #[inline]
    #[must_use]
    pub const fn completed_tiles(&self) -> usize {
        self.completed_tiles
    }

    /// Pixels returned so far.
    #[inline]
    #[must_use]
    pub const fn pixels_delivered(&self) -> u64 {
        self.pixels_delivered
    }

    /// Fallback pixels returned so far.
    #[inline]
    #[must_use]
    pub const fn pixels_substituted(&self) -> u64 {
        self.pixels_substituted
    }

    /// True once every planned tile has come back.
    #[inline]
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed_tiles == self.total_tiles
    }
}

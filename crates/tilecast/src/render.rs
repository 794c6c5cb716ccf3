//! # Driving a Render
//!
//! Sends one request and paints its tiles as they stream in.

use tilecast_core::SceneConfig;
use tilecast_engine::RenderHost;
use tilecast_protocol::EngineMessage;

use crate::canvas::Canvas;
use crate::error::{HostError, HostResult};

/// Summary of a finished render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Tiles painted.
    pub tiles: u64,
    /// Pixel bytes received.
    pub bytes: u64,
    /// Pixels the engine replaced with the fallback color.
    pub substituted: u64,
}

/// Requests `config` and paints every tile until `Done`.
///
/// `progress` is called after each tile with the painted and total pixel
/// counts.
pub fn render_to_canvas<F>(
    host: &mut RenderHost,
    config: SceneConfig,
    mut progress: F,
) -> HostResult<(Canvas, RenderReport)>
where
    F: FnMut(u64, u64),
{
    let session = host.request(config)?;
    let mut canvas = Canvas::new(config.width, config.height);
    let mut report = RenderReport::default();
    let total = config.pixel_count();
    tracing::info!(
        "Rendering {}x{} ({} sky, {} scene) as session {}",
        config.width,
        config.height,
        config.sky.name(),
        config.scene.name(),
        session
    );

    loop {
        match host.recv()? {
            EngineMessage::Ready => {}
            EngineMessage::Tile(tile) => {
                canvas.paint_tile(&tile)?;
                report.tiles += 1;
                report.bytes += tile.pixels.as_bytes().len() as u64;
                report.substituted += u64::from(tile.substituted);
                progress(canvas.painted_pixels(), total);
            }
            EngineMessage::Done { session: done } => {
                debug_assert_eq!(done, session);
                if !canvas.is_complete() {
                    return Err(HostError::Incomplete {
                        session,
                        missing: total - canvas.painted_pixels(),
                    });
                }
                if report.substituted > 0 {
                    tracing::warn!("{} pixels were replaced with the fallback color", report.substituted);
                }
                tracing::info!("Session {} done: {} tiles, {} bytes", session, report.tiles, report.bytes);
                return Ok((canvas, report));
            }
            EngineMessage::Failed { session, reason } => {
                return Err(HostError::SessionFailed { session, reason });
            }
            EngineMessage::Rejected { session, reason } => {
                return Err(HostError::Rejected { session, reason });
            }
        }
    }
}

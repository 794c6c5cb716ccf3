//! # TILECAST
//!
//! Host side of the tile-streaming tracer: a [`Canvas`] that tiles are
//! painted onto as they arrive, PPM export, and a helper that drives one
//! render from request to `Done`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tilecast::{render_to_canvas, PpmFormat};
//! use tilecast_core::SceneConfig;
//! use tilecast_engine::{EngineConfig, EngineHandle};
//!
//! let (engine, mut host) = EngineHandle::spawn(EngineConfig::preview())?;
//! let (canvas, _report) = render_to_canvas(&mut host, SceneConfig::default(), |_, _| {})?;
//! canvas.write_ppm(std::io::stdout().lock(), PpmFormat::Binary)?;
//! engine.shutdown();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod canvas;
pub mod error;
pub mod render;

pub use canvas::{Canvas, PpmFormat};
pub use error::{HostError, HostResult};
pub use render::{render_to_canvas, RenderReport};

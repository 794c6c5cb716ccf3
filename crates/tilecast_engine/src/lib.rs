//! # TILECAST Engine
//!
//! Renders one image at a time, tile by tile, on a pool of worker threads,
//! and streams each tile to the host as soon as it is finished.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                          ENGINE                           │
//! ├───────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌───────────────┐   ┌──────────────┐  │
//! │  │ RenderChannel│──>│  Dispatcher   │──>│ Tile workers │  │
//! │  │  (requests)  │<──│ (RenderEngine)│<──│   (pool)     │  │
//! │  └──────────────┘   └───────────────┘   └──────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - The tiles of a session cover the image exactly once.
//! - `Done` follows the last tile of a session, once.
//! - A new request abandons the one in flight; nothing tagged with the old
//!   session is sent after the new one starts producing output.
//! - Pixels depend only on the scene config and the quality settings, never
//!   on tile size, tile order or thread count.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tilecast_core::SceneConfig;
//! use tilecast_engine::{EngineConfig, EngineHandle};
//! use tilecast_protocol::EngineMessage;
//!
//! let (engine, mut host) = EngineHandle::spawn(EngineConfig::preview())?;
//! let session = host.request(SceneConfig::default())?;
//! loop {
//!     match host.recv()? {
//!         EngineMessage::Tile(tile) => println!("tile at {},{}", tile.rect.x, tile.rect.y),
//!         EngineMessage::Done { session: done } if done == session => break,
//!         _ => {}
//!     }
//! }
//! engine.shutdown();
//! # Ok::<(), tilecast_engine::EngineError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;
pub mod tiler;
pub mod worker;

pub use channel::{render_channel, EngineEndpoint, RenderHost};
pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineState, RenderEngine, TileVerdict};
pub use error::{EngineError, EngineResult};
pub use session::{RenderSession, RenderedTile, TileTask};
pub use worker::{EngineHandle, EngineStats};

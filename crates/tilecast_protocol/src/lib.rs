//! # TILECAST Protocol
//!
//! What travels between a host and a render engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   HostMessage    ┌────────────┐
//! │    HOST    │ ───────────────> │   ENGINE   │
//! │  (canvas)  │ <─────────────── │  (tiles)   │
//! └────────────┘  EngineMessage   └────────────┘
//!        │                               │
//!        └────── codec (optional) ───────┘
//! ```
//!
//! In-process, messages move as Rust values and tile pixels move by
//! ownership. Across a byte boundary, [`codec`] turns each message into a
//! single little-endian frame.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod codec;
pub mod error;
pub mod messages;
pub mod tile;

pub use codec::{decode_engine, decode_host, encode_engine, encode_host, MessageReader, MessageWriter};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{EngineMessage, HostMessage, MessageType};
pub use tile::{PixelBuffer, SessionId, TileRect, TileResult};

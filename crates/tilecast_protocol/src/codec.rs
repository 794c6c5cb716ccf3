//! # Wire Codec
//!
//! Byte encoding of channel messages for hosts on the far side of a byte
//! boundary (a socket, a worker `postMessage`, a pipe). In-process hosts
//! never encode anything; they receive the enums directly.
//!
//! ## Frames
//!
//! ```text
//! Ready    : [0x01]
//! Tile     : [0x02][session u64][x u32][y u32][w u32][h u32][substituted u32][pixels w*h*3]
//! Done     : [0x03][session u64]
//! Failed   : [0x04][session u64][len u16][utf-8 reason]
//! Rejected : [0x05][session u64][len u16][utf-8 reason]
//! Render   : [0x10][session u64][width u32][height u32][sky u8][scene u8][hue1 3][hue2 3]
//! Shutdown : [0x11]
//! ```
//!
//! All integers are little-endian. A frame is exactly one message: short
//! frames and leftover bytes are both errors.

use tilecast_core::{Rgb8, SceneConfig, SceneVariant, SkyVariant};

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::{EngineMessage, HostMessage, MessageType};
use crate::tile::{PixelBuffer, SessionId, TileRect, TileResult};

/// Encoded size of a tile frame before its pixels.
pub const TILE_HEADER_SIZE: usize = 1 + 8 + 4 * 5;

/// Encoded size of a render request frame.
pub const RENDER_FRAME_SIZE: usize = 1 + 8 + 4 + 4 + 1 + 1 + 3 + 3;

/// Writes message frames into a growable buffer.
///
/// Reuse one writer across messages to keep its allocation.
#[derive(Debug, Default)]
pub struct MessageWriter {
    buffer: Vec<u8>,
}

impl MessageWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Clears the buffer, keeping its capacity.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Releases the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a u64 in little-endian format.
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a color as three bytes.
    #[inline]
    pub fn write_rgb(&mut self, color: Rgb8) {
        self.write_bytes(&color.to_array());
    }

    /// Writes a length-prefixed string, cut at a character boundary if it
    /// does not fit a u16 length.
    pub fn write_reason(&mut self, reason: &str) {
        let mut end = reason.len().min(usize::from(u16::MAX));
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        // end <= u16::MAX
        self.write_u16(end as u16);
        self.write_bytes(&reason.as_bytes()[..end]);
    }

    /// Serializes an engine message, replacing the buffer contents.
    pub fn serialize_engine(&mut self, message: &EngineMessage) {
        self.reset();
        self.write_u8(message.message_type() as u8);
        match message {
            EngineMessage::Ready => {}
            EngineMessage::Tile(tile) => {
                self.buffer.reserve(TILE_HEADER_SIZE + tile.pixels.as_bytes().len());
                self.write_u64(tile.session.0);
                self.write_u32(tile.rect.x);
                self.write_u32(tile.rect.y);
                self.write_u32(tile.rect.width);
                self.write_u32(tile.rect.height);
                self.write_u32(tile.substituted);
                self.write_bytes(tile.pixels.as_bytes());
            }
            EngineMessage::Done { session } => self.write_u64(session.0),
            EngineMessage::Failed { session, reason }
            | EngineMessage::Rejected { session, reason } => {
                self.write_u64(session.0);
                self.write_reason(reason);
            }
        }
    }

    /// Serializes a host message, replacing the buffer contents.
    pub fn serialize_host(&mut self, message: &HostMessage) {
        self.reset();
        self.write_u8(message.message_type() as u8);
        match message {
            HostMessage::Render { session, config } => {
                self.write_u64(session.0);
                self.write_u32(config.width);
                self.write_u32(config.height);
                self.write_u8(config.sky as u8);
                self.write_u8(config.scene as u8);
                self.write_rgb(config.hue1);
                self.write_rgb(config.hue2);
            }
            HostMessage::Shutdown => {}
        }
    }
}

/// Reads fields out of one frame.
pub struct MessageReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> MessageReader<'a> {
    /// Creates a new reader over a frame.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> ProtocolResult<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(ProtocolError::Truncated { needed: len, remaining });
        }
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a u16 in little-endian format.
    #[inline]
    pub fn read_u16(&mut self) -> ProtocolResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a u32 in little-endian format.
    #[inline]
    pub fn read_u32(&mut self) -> ProtocolResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a u64 in little-endian format.
    #[inline]
    pub fn read_u64(&mut self) -> ProtocolResult<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads a three-byte color.
    #[inline]
    pub fn read_rgb(&mut self) -> ProtocolResult<Rgb8> {
        self.read_array().map(Rgb8::from_array)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_reason(&mut self) -> ProtocolResult<String> {
        let len = usize::from(self.read_u16()?);
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Reads the message tag.
    pub fn read_type(&mut self) -> ProtocolResult<MessageType> {
        if self.remaining() == 0 {
            return Err(ProtocolError::Empty);
        }
        MessageType::try_from(self.read_u8()?).map_err(ProtocolError::UnknownType)
    }

    /// Fails if any bytes are left.
    pub fn finish(&self) -> ProtocolResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }

    /// Deserializes a whole engine message frame.
    pub fn deserialize_engine(&mut self) -> ProtocolResult<EngineMessage> {
        let message = match self.read_type()? {
            MessageType::Ready => EngineMessage::Ready,
            MessageType::Tile => {
                let session = SessionId(self.read_u64()?);
                let rect = TileRect::new(
                    self.read_u32()?,
                    self.read_u32()?,
                    self.read_u32()?,
                    self.read_u32()?,
                );
                let substituted = self.read_u32()?;
                rect.validate()?;
                let bytes = self.read_bytes(rect.byte_len())?.to_vec();
                let pixels = PixelBuffer::from_bytes(rect.width, rect.height, bytes)?;
                EngineMessage::Tile(TileResult::new(session, rect, pixels, substituted)?)
            }
            MessageType::Done => EngineMessage::Done { session: SessionId(self.read_u64()?) },
            MessageType::Failed => EngineMessage::Failed {
                session: SessionId(self.read_u64()?),
                reason: self.read_reason()?,
            },
            MessageType::Rejected => EngineMessage::Rejected {
                session: SessionId(self.read_u64()?),
                reason: self.read_reason()?,
            },
            other @ (MessageType::Render | MessageType::Shutdown) => {
                return Err(ProtocolError::UnknownType(other as u8));
            }
        };
        self.finish()?;
        Ok(message)
    }

    /// Deserializes a whole host message frame, validating render configs.
    pub fn deserialize_host(&mut self) -> ProtocolResult<HostMessage> {
        let message = match self.read_type()? {
            MessageType::Render => {
                let session = SessionId(self.read_u64()?);
                let width = self.read_u32()?;
                let height = self.read_u32()?;
                let sky = self.read_u8()?;
                let scene = self.read_u8()?;
                let hue1 = self.read_rgb()?;
                let hue2 = self.read_rgb()?;
                let config = SceneConfig::new(
                    width,
                    height,
                    SkyVariant::try_from(sky)?,
                    SceneVariant::try_from(scene)?,
                    hue1,
                    hue2,
                )?;
                HostMessage::Render { session, config }
            }
            MessageType::Shutdown => HostMessage::Shutdown,
            other => return Err(ProtocolError::UnknownType(other as u8)),
        };
        self.finish()?;
        Ok(message)
    }
}

/// Encodes an engine message into a fresh buffer.
#[must_use]
pub fn encode_engine(message: &EngineMessage) -> Vec<u8> {
    let mut writer = MessageWriter::new();
    writer.serialize_engine(message);
    writer.into_bytes()
}

/// Decodes one engine message frame.
pub fn decode_engine(frame: &[u8]) -> ProtocolResult<EngineMessage> {
    MessageReader::new(frame).deserialize_engine()
}

/// Encodes a host message into a fresh buffer.
#[must_use]
pub fn encode_host(message: &HostMessage) -> Vec<u8> {
    let mut writer = MessageWriter::new();
    writer.serialize_host(message);
    writer.into_bytes()
}

/// Decodes one host message frame.
pub fn decode_host(frame: &[u8]) -> ProtocolResult<HostMessage> {
    MessageReader::new(frame).deserialize_host()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecast_core::SceneError;

    fn sample_tile() -> TileResult {
        let bytes: Vec<u8> = (0u8..18).collect();
        let pixels = PixelBuffer::from_bytes(3, 2, bytes).unwrap();
        TileResult::new(SessionId(7), TileRect::new(64, 128, 3, 2), pixels, 1).unwrap()
    }

    #[test]
    fn test_tile_frame_layout() {
        let frame = encode_engine(&EngineMessage::Tile(sample_tile()));
        assert_eq!(frame.len(), TILE_HEADER_SIZE + 18);
        assert_eq!(frame[0], 0x02);
        assert_eq!(&frame[1..9], &7u64.to_le_bytes());
        assert_eq!(&frame[9..13], &64u32.to_le_bytes());
        assert_eq!(&frame[13..17], &128u32.to_le_bytes());
        assert_eq!(&frame[25..29], &1u32.to_le_bytes());
        assert_eq!(&frame[29..], &(0u8..18).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_engine_messages_decode_what_they_encode() {
        let messages = [
            EngineMessage::Ready,
            EngineMessage::Tile(sample_tile()),
            EngineMessage::Done { session: SessionId(u64::MAX) },
            EngineMessage::Failed { session: SessionId(3), reason: "worker lost".into() },
            EngineMessage::Rejected { session: SessionId(4), reason: "héllo".into() },
        ];
        for message in messages {
            let frame = encode_engine(&message);
            assert_eq!(decode_engine(&frame).unwrap(), message);
        }
    }

    #[test]
    fn test_render_frame() {
        let config =
            SceneConfig::from_raw(128, 128, 2, 0, [255, 0, 0], [0, 0, 255]).unwrap();
        let message = HostMessage::Render { session: SessionId(9), config };
        let frame = encode_host(&message);
        assert_eq!(frame.len(), RENDER_FRAME_SIZE);
        assert_eq!(frame[0], 0x10);
        assert_eq!(&frame[frame.len() - 6..], &[255, 0, 0, 0, 0, 255]);
        assert_eq!(decode_host(&frame).unwrap(), message);
        assert_eq!(decode_host(&encode_host(&HostMessage::Shutdown)).unwrap(), HostMessage::Shutdown);
    }

    #[test]
    fn test_render_frame_validates_config() {
        let mut frame = encode_host(&HostMessage::Render {
            session: SessionId(1),
            config: SceneConfig::default(),
        });
        // width = 0
        frame[9..13].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            decode_host(&frame),
            Err(ProtocolError::InvalidScene(SceneError::EmptyImage { .. }))
        ));

        let mut frame = encode_host(&HostMessage::Render {
            session: SessionId(1),
            config: SceneConfig::default(),
        });
        frame[17] = 9;
        assert_eq!(
            decode_host(&frame),
            Err(ProtocolError::InvalidScene(SceneError::UnknownSky(9)))
        );
    }

    #[test]
    fn test_rejects_bad_frames() {
        assert_eq!(decode_engine(&[]), Err(ProtocolError::Empty));
        assert_eq!(decode_engine(&[0x7f]), Err(ProtocolError::UnknownType(0x7f)));
        assert_eq!(decode_engine(&[0x10]), Err(ProtocolError::UnknownType(0x10)));
        assert_eq!(decode_host(&[0x01]), Err(ProtocolError::UnknownType(0x01)));
        assert_eq!(decode_engine(&[0x01, 0x00]), Err(ProtocolError::TrailingBytes(1)));
        assert!(matches!(decode_engine(&[0x03, 1, 2]), Err(ProtocolError::Truncated { .. })));

        let mut frame = encode_engine(&EngineMessage::Tile(sample_tile()));
        frame.pop();
        assert_eq!(
            decode_engine(&frame),
            Err(ProtocolError::Truncated { needed: 18, remaining: 17 })
        );
    }

    #[test]
    fn test_zero_sized_tile_rejected() {
        let mut frame = encode_engine(&EngineMessage::Tile(sample_tile()));
        frame[17..21].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(
            decode_engine(&frame),
            Err(ProtocolError::TileSize { width: 0, height: 2 })
        );
    }

    #[test]
    fn test_reason_truncated_at_char_boundary() {
        let long = "é".repeat(40_000);
        let frame = encode_engine(&EngineMessage::Failed { session: SessionId(1), reason: long });
        let decoded = decode_engine(&frame).unwrap();
        let EngineMessage::Failed { reason, .. } = decoded else {
            panic!("Expected Failed message");
        };
        assert_eq!(reason.len(), 65_534);
        assert!(reason.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_invalid_utf8_reason() {
        let mut frame = encode_engine(&EngineMessage::Rejected {
            session: SessionId(1),
            reason: "ab".into(),
        });
        let last = frame.len() - 1;
        frame[last] = 0xff;
        assert_eq!(decode_engine(&frame), Err(ProtocolError::InvalidUtf8));
    }
}

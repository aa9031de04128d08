//! Little-endian packet writer and reader
//!
//! Primitive encodings:
//! - integers and floats: little-endian, natural width
//! - `bool`: one byte, 0 or 1
//! - object ids ("bc"): 24-bit unsigned
//! - positions: three 24-bit signed fixed-point values, 1/256 unit steps
//! - timestamps: `i64` unix seconds, 0 when unset

use chrono::{DateTime, Utc};
use doodad_core::ObjectId;
use doodad_math::Vec3;
use thiserror::Error;

/// Fixed-point steps per world unit for positions
pub const POSITION_SCALE: f32 = 256.0;

const I24_MIN: i32 = -(1 << 23);
const I24_MAX: i32 = (1 << 23) - 1;

/// Errors reading a payload
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// Payload ended early
    #[error("unexpected end of packet: needed {needed} bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },
}

/// Growable payload buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketStream {
    buf: Vec<u8>,
}

impl PacketStream {
    /// Create an empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty stream with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(value as u8)
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Object id as a 24-bit value
    pub fn write_bc(&mut self, id: ObjectId) -> &mut Self {
        let raw = id.get() & ObjectId::MAX;
        self.buf.extend_from_slice(&raw.to_le_bytes()[..3]);
        self
    }

    /// Position as three 24-bit fixed-point values
    pub fn write_position(&mut self, position: Vec3) -> &mut Self {
        for value in position.to_array() {
            let fixed = (value * POSITION_SCALE).round() as i64;
            let fixed = fixed.clamp(I24_MIN as i64, I24_MAX as i64) as i32;
            self.buf.extend_from_slice(&fixed.to_le_bytes()[..3]);
        }
        self
    }

    /// Timestamp as unix seconds, 0 when unset
    pub fn write_time(&mut self, time: Option<DateTime<Utc>>) -> &mut Self {
        self.write_i64(time.map(|t| t.timestamp()).unwrap_or(0))
    }
}

/// Cursor over a received payload
#[derive(Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Bytes not read yet
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        let end = self.offset + N;
        let slice = self.buf.get(self.offset..end).ok_or(StreamError::UnexpectedEof {
            offset: self.offset,
            needed: N,
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.offset = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, StreamError> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, StreamError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, StreamError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, StreamError> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, StreamError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    pub fn read_bc(&mut self) -> Result<ObjectId, StreamError> {
        let [a, b, c] = self.take::<3>()?;
        Ok(ObjectId::new(u32::from_le_bytes([a, b, c, 0])))
    }

    pub fn read_position(&mut self) -> Result<Vec3, StreamError> {
        let mut out = [0.0f32; 3];
        for value in &mut out {
            let [a, b, c] = self.take::<3>()?;
            // Sign-extend from 24 bits
            let fixed = i32::from_le_bytes([a, b, c, 0]) << 8 >> 8;
            *value = fixed as f32 / POSITION_SCALE;
        }
        Ok(Vec3::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bc_is_three_bytes() {
        let mut stream = PacketStream::new();
        stream.write_bc(ObjectId::new(0x0012_3456));
        assert_eq!(stream.as_bytes(), &[0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_position_fixed_point() {
        let mut stream = PacketStream::new();
        stream.write_position(Vec3::new(1.0, -1.0, 0.5));
        assert_eq!(
            stream.as_bytes(),
            &[0x00, 0x01, 0x00, 0x00, 0xFF, 0xFF, 0x80, 0x00, 0x00]
        );

        let mut reader = PacketReader::new(stream.as_bytes());
        assert_eq!(reader.read_position().unwrap(), Vec3::new(1.0, -1.0, 0.5));
    }

    #[test]
    fn test_position_clamps() {
        let mut stream = PacketStream::new();
        stream.write_position(Vec3::new(1.0e9, -1.0e9, 0.0));
        let pos = PacketReader::new(stream.as_bytes()).read_position().unwrap();
        assert!((pos.x - I24_MAX as f32 / POSITION_SCALE).abs() < 1e-3);
        assert!((pos.y - I24_MIN as f32 / POSITION_SCALE).abs() < 1e-3);
    }

    #[test]
    fn test_unset_time_is_zero() {
        let mut stream = PacketStream::new();
        stream.write_time(None);
        assert_eq!(stream.as_bytes(), &[0u8; 8]);
    }

    #[test]
    fn test_reader_eof() {
        let mut reader = PacketReader::new(&[1, 2]);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(
            reader.read_u32(),
            Err(StreamError::UnexpectedEof {
                offset: 1,
                needed: 4
            })
        );
    }
}

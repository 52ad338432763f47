//! Bounds-checked reading over a borrowed program image.

use thiserror::Error;

/// Errors produced by primitive reads from the image.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Unexpected end of image
    #[error("unexpected end of image at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid UTF-8 in a string payload
    #[error("invalid UTF-8 string payload at offset {0}")]
    InvalidUtf8(usize),
}

/// Forward-only read position over a borrowed program image.
///
/// The cursor never owns the buffer and never rewinds: every read advances
/// it, and [`ImageCursor::jump_to`] only accepts targets at or beyond the
/// current position. Every access is bounds-checked and fails with
/// [`ReadError::UnexpectedEnd`] instead of panicking.
pub struct ImageCursor<'image> {
    buffer: &'image [u8],
    position: usize,
}

impl<'image> ImageCursor<'image> {
    /// Create a cursor at the start of `buffer`.
    pub fn new(buffer: &'image [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Current offset into the image.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left between the cursor and the end of the image.
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Reposition the cursor for a declared-size section jump.
    ///
    /// The target must lie at or beyond the current position and within the
    /// image, so the cursor stays forward-only even when a section's declared
    /// size disagrees with the bytes structurally consumed from it.
    pub fn jump_to(&mut self, target: usize) -> Result<(), ReadError> {
        if target < self.position || target > self.buffer.len() {
            return Err(ReadError::UnexpectedEnd(self.position));
        }
        self.position = target;
        Ok(())
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        if self.position >= self.buffer.len() {
            return Err(ReadError::UnexpectedEnd(self.position));
        }
        let value = self.buffer[self.position];
        self.position += 1;
        Ok(value)
    }

    /// Read a 16-bit unsigned integer (big-endian).
    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        if self.position + 2 > self.buffer.len() {
            return Err(ReadError::UnexpectedEnd(self.position));
        }
        let bytes = [self.buffer[self.position], self.buffer[self.position + 1]];
        self.position += 2;
        Ok(u16::from_be_bytes(bytes))
    }

    /// Read a 32-bit unsigned integer (big-endian).
    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        if self.position + 4 > self.buffer.len() {
            return Err(ReadError::UnexpectedEnd(self.position));
        }
        let bytes = [
            self.buffer[self.position],
            self.buffer[self.position + 1],
            self.buffer[self.position + 2],
            self.buffer[self.position + 3],
        ];
        self.position += 4;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Read a 64-bit float in the producer's native byte order.
    pub fn read_f64_native(&mut self) -> Result<f64, ReadError> {
        if self.position + 8 > self.buffer.len() {
            return Err(ReadError::UnexpectedEnd(self.position));
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + 8]);
        self.position += 8;
        Ok(f64::from_ne_bytes(bytes))
    }

    /// Read a 4-byte tag.
    pub fn read_tag(&mut self) -> Result<[u8; 4], ReadError> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Borrow `count` bytes out of the image and advance past them.
    pub fn take(&mut self, count: usize) -> Result<&'image [u8], ReadError> {
        let end = self
            .position
            .checked_add(count)
            .ok_or(ReadError::UnexpectedEnd(self.position))?;
        if end > self.buffer.len() {
            return Err(ReadError::UnexpectedEnd(self.position));
        }
        let bytes = &self.buffer[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Advance past `count` bytes without interpreting them.
    pub fn skip(&mut self, count: usize) -> Result<(), ReadError> {
        self.take(count).map(|_| ())
    }
}

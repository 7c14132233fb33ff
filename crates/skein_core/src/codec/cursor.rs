//! # Cursor Views
//!
//! Sequential read/write cursors over fixed byte buffers.
//!
//! ## Design
//!
//! - Borrows the caller's buffer (no per-record allocation)
//! - Little-endian fixed-width primitives; each access advances the offset
//!   by exactly the primitive's width
//! - No self-describing framing: the reader must decode fields in the exact
//!   order and width they were written

use bytemuck::Pod;

use super::{CodecError, CodecResult};

/// Write cursor over a fixed byte buffer.
///
/// A writer must [`reset`](Self::reset) before starting a new record; the
/// bytes written since the last reset are available through
/// [`written`](Self::written).
pub struct CursorWriter<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> CursorWriter<'a> {
    /// Creates a writer positioned at the start of `buffer`.
    #[must_use]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the current offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the capacity of the backing buffer.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Moves the cursor to an absolute offset.
    pub fn seek(&mut self, offset: usize) -> CodecResult<()> {
        if offset > self.buffer.len() {
            return Err(CodecError::Overflow {
                offset,
                width: 0,
                capacity: self.buffer.len(),
            });
        }
        self.position = offset;
        Ok(())
    }

    /// Resets the cursor to offset zero for a new record.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Returns exactly the bytes written since the last reset.
    #[inline]
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    #[inline]
    fn write_raw(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let end = self.position + bytes.len();
        if end > self.buffer.len() {
            return Err(CodecError::Overflow {
                offset: self.position,
                width: bytes.len(),
                capacity: self.buffer.len(),
            });
        }
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.write_raw(&[value])
    }

    /// Writes an i8.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> CodecResult<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes an i16 in little-endian format.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> CodecResult<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes an i32 in little-endian format.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes a u64 in little-endian format.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes an f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> CodecResult<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes an f64 in little-endian format.
    #[inline]
    pub fn write_f64(&mut self, value: f64) -> CodecResult<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes a raw byte slice.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.write_raw(bytes)
    }

    /// Writes a Pod value directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> CodecResult<()> {
        self.write_raw(bytemuck::bytes_of(value))
    }
}

/// Read cursor over a byte buffer.
///
/// Fields must be decoded in the exact order and width they were encoded;
/// the schema is implicit and shared by both ends out-of-band.
pub struct CursorReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> CursorReader<'a> {
    /// Creates a reader positioned at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the current offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes left to read.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Moves the cursor to an absolute offset.
    pub fn seek(&mut self, offset: usize) -> CodecResult<()> {
        if offset > self.buffer.len() {
            return Err(CodecError::Underflow {
                offset,
                width: 0,
                len: self.buffer.len(),
            });
        }
        self.position = offset;
        Ok(())
    }

    #[inline]
    fn read_raw<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let end = self.position + N;
        if end > self.buffer.len() {
            return Err(CodecError::Underflow {
                offset: self.position,
                width: N,
                len: self.buffer.len(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.position..end]);
        self.position = end;
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_raw::<1>()?[0])
    }

    /// Reads an i8.
    #[inline]
    pub fn read_i8(&mut self) -> CodecResult<i8> {
        Ok(i8::from_le_bytes(self.read_raw::<1>()?))
    }

    /// Reads a u16 in little-endian format.
    #[inline]
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.read_raw::<2>()?))
    }

    /// Reads an i16 in little-endian format.
    #[inline]
    pub fn read_i16(&mut self) -> CodecResult<i16> {
        Ok(i16::from_le_bytes(self.read_raw::<2>()?))
    }

    /// Reads a u32 in little-endian format.
    #[inline]
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.read_raw::<4>()?))
    }

    /// Reads an i32 in little-endian format.
    #[inline]
    pub fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.read_raw::<4>()?))
    }

    /// Reads a u64 in little-endian format.
    #[inline]
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.read_raw::<8>()?))
    }

    /// Reads an f32 in little-endian format.
    #[inline]
    pub fn read_f32(&mut self) -> CodecResult<f32> {
        Ok(f32::from_le_bytes(self.read_raw::<4>()?))
    }

    /// Reads an f64 in little-endian format.
    #[inline]
    pub fn read_f64(&mut self) -> CodecResult<f64> {
        Ok(f64::from_le_bytes(self.read_raw::<8>()?))
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.position + len;
        if end > self.buffer.len() {
            return Err(CodecError::Underflow {
                offset: self.position,
                width: len,
                len: self.buffer.len(),
            });
        }
        let slice = &self.buffer[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Reads a Pod value directly.
    #[inline]
    pub fn read_pod<T: Pod + Copy>(&mut self) -> CodecResult<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        bytemuck::try_pod_read_unaligned(bytes).map_err(|_| CodecError::Underflow {
            offset: self.position - size,
            width: size,
            len: self.buffer.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let mut buf = [0u8; 32];
        let mut writer = CursorWriter::new(&mut buf);
        writer.write_u8(0xAB).unwrap();
        writer.write_u16(0x1234).unwrap();
        writer.write_u32(0xDEAD_BEEF).unwrap();
        writer.write_f32(1.5).unwrap();
        writer.write_i32(-7).unwrap();
        let written = writer.written().to_vec();
        assert_eq!(written.len(), 1 + 2 + 4 + 4 + 4);

        let mut reader = CursorReader::new(&written);
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert!((reader.read_f32().unwrap() - 1.5).abs() < f32::EPSILON);
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_write_past_capacity_fails() {
        let mut buf = [0u8; 3];
        let mut writer = CursorWriter::new(&mut buf);
        writer.write_u16(1).unwrap();
        let err = writer.write_u32(2).unwrap_err();
        assert!(matches!(err, CodecError::Overflow { offset: 2, width: 4, capacity: 3 }));
        // The failed write did not advance the cursor.
        assert_eq!(writer.position(), 2);
    }

    #[test]
    fn test_read_past_end_fails() {
        let buf = [1u8, 2];
        let mut reader = CursorReader::new(&buf);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert!(matches!(reader.read_u32(), Err(CodecError::Underflow { .. })));
        // Cursor unchanged after the failed read.
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_written_since_reset() {
        let mut buf = [0u8; 16];
        let mut writer = CursorWriter::new(&mut buf);
        writer.write_u32(7).unwrap();
        writer.reset();
        writer.write_u8(9).unwrap();
        assert_eq!(writer.written(), &[9]);
    }

    #[test]
    fn test_write_read_pod() {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
        struct Sample {
            a: u32,
            b: f32,
        }

        let mut buf = [0u8; 8];
        let mut writer = CursorWriter::new(&mut buf);
        writer.write_pod(&Sample { a: 42, b: 0.5 }).unwrap();

        let mut reader = CursorReader::new(&buf);
        let out: Sample = reader.read_pod().unwrap();
        assert_eq!(out, Sample { a: 42, b: 0.5 });
    }
}

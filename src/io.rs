//! Stream primitive for persisting values.
//!
//! Values are written through [`BufferWriter`], a write-with-bounds sink.
//! Loading goes the other way through plain byte slices: every decoder
//! reports the bytes it consumed or a [`StoreError`].

use crate::error::{Result, StoreError};

/// Sink for persisted values.
pub trait BufferWriter {
    /// Append `src`, or fail with [`StoreError::InsufficientSpace`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InsufficientSpace`] when the sink is bounded
    /// and `src` does not fit. Nothing is written in that case.
    fn write(&mut self, src: &[u8]) -> Result<()>;

    /// Flush buffered data, if any.
    ///
    /// # Errors
    ///
    /// Implementation specific; the provided sinks never fail.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl BufferWriter for Vec<u8> {
    fn write(&mut self, src: &[u8]) -> Result<()> {
        self.extend_from_slice(src);
        Ok(())
    }
}

/// Bounded sink over a caller-provided slice.
#[derive(Debug)]
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    /// Wrap `buf`; writing starts at its first byte.
    #[must_use]
    pub const fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.pos
    }

    /// Bytes still available.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

impl BufferWriter for SliceWriter<'_> {
    fn write(&mut self, src: &[u8]) -> Result<()> {
        let available: usize = self.remaining();
        if src.len() > available {
            return Err(StoreError::InsufficientSpace {
                needed: src.len(),
                available,
            });
        }

        let end: usize = self.pos + src.len();
        self.buf[self.pos..end].copy_from_slice(src);
        self.pos = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_writer_appends() {
        let mut out: Vec<u8> = Vec::new();
        out.write(b"ab").unwrap();
        out.write(b"c").unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_slice_writer_bounds() {
        let mut buf = [0_u8; 4];
        let mut writer = SliceWriter::new(&mut buf);
        writer.write(b"abc").unwrap();
        assert_eq!(writer.remaining(), 1);

        let err = writer.write(b"de").unwrap_err();
        assert_eq!(
            err,
            StoreError::InsufficientSpace {
                needed: 2,
                available: 1
            }
        );
        assert_eq!(writer.written(), 3);
        assert_eq!(&buf[..3], b"abc");
    }
}

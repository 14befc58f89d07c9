//! The growable, capped byte buffer backing the catalog codec: starts at 4 KiB, doubles as `bytes::BytesMut` grows it, and
//! refuses to grow past a configured hard cap (zero meaning unlimited).
//! Builds its output into a `BytesMut` sized up front and fails fast
//! rather than growing without bound.

use bytes::{BufMut, BytesMut};

use crate::error::{CResult, Error};

pub const INITIAL_CAPACITY: usize = 4 * 1024;

pub struct GrowableBuffer {
    buf: BytesMut,
    /// Hard cap in bytes; zero means unlimited.
    cap: usize,
}

impl GrowableBuffer {
    pub fn new(cap: usize) -> Self {
        GrowableBuffer { buf: BytesMut::with_capacity(INITIAL_CAPACITY), cap }
    }

    /// Appends `bytes`, or fails with `CatalogTooLarge` if doing so would
    /// exceed the configured cap.
    pub fn write(&mut self, bytes: &[u8]) -> CResult<()> {
        if self.cap != 0 && self.buf.len() + bytes.len() > self.cap {
            return Err(Error::CatalogTooLarge { cap: self.cap });
        }
        self.buf.put(bytes);
        Ok(())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

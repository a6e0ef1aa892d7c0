//! Growable buffer for streaming bytecode out of `lua_dump`.
//!
//! The serializer hands over chunks of arbitrary size through a C callback.
//! [`DumpWriter`] collects them into one contiguous buffer; it is single use:
//! one writer per dump, consumed by [`DumpWriter::finish`].

use mlua_sys as ffi;
use std::collections::TryReserveError;
use std::os::raw::{c_int, c_void};

/// Smallest growth step, in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Append-only byte buffer with block-rounded, amortised growth
#[derive(Debug)]
pub struct DumpWriter {
    buf: Vec<u8>,
    block_size: usize,
}

impl DumpWriter {
    /// Create an empty writer with the default block size
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    /// Create an empty writer; a zero block size is treated as 1
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            buf: Vec::new(),
            block_size: block_size.max(1),
        }
    }

    /// Append a chunk at the write cursor.
    ///
    /// When the chunk does not fit, capacity grows by the shortfall, but never
    /// by less than one block nor less than the current capacity. Already
    /// written bytes are preserved. Allocation failure is reported, not
    /// panicked on, since this runs inside a C callback.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), TryReserveError> {
        let available = self.buf.capacity() - self.buf.len();
        if chunk.len() > available {
            let shortfall = chunk.len() - available;
            let grow = shortfall
                .max(self.block_size)
                .max(self.buf.capacity());
            // try_reserve_exact counts from len, not from capacity
            self.buf.try_reserve_exact(available + grow)?;
        }
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current capacity of the underlying buffer
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// The written span `[0, len)`
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, yielding the written bytes
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for DumpWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// `lua_Writer` callback; `ud` must point at a live [`DumpWriter`].
///
/// A non-zero return aborts the dump.
pub(crate) unsafe extern "C-unwind" fn write_chunk(
    _state: *mut ffi::lua_State,
    p: *const c_void,
    size: usize,
    ud: *mut c_void,
) -> c_int {
    let writer = &mut *(ud as *mut DumpWriter);
    let chunk = if size == 0 || p.is_null() {
        &[][..]
    } else {
        std::slice::from_raw_parts(p as *const u8, size)
    };
    match writer.append(chunk) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_reserves_a_block() {
        let mut writer = DumpWriter::new();
        assert_eq!(writer.capacity(), 0);

        writer.append(b"\x1bLua").unwrap();
        assert_eq!(writer.len(), 4);
        assert!(writer.capacity() >= DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_first_write_larger_than_block() {
        let mut writer = DumpWriter::with_block_size(16);
        let chunk = vec![7u8; 100];
        writer.append(&chunk).unwrap();
        assert!(writer.capacity() >= 100);
        assert_eq!(writer.as_bytes(), &chunk[..]);
    }

    #[test]
    fn test_growth_across_block_boundary_keeps_order() {
        let mut writer = DumpWriter::with_block_size(8);
        let mut expected = Vec::new();
        for i in 0..50u8 {
            let chunk: Vec<u8> = (0..=i % 13).map(|b| b.wrapping_mul(i)).collect();
            expected.extend_from_slice(&chunk);
            writer.append(&chunk).unwrap();
            assert!(writer.len() <= writer.capacity());
        }
        assert_eq!(writer.finish(), expected);
    }

    #[test]
    fn test_capacity_never_shrinks() {
        let mut writer = DumpWriter::with_block_size(4);
        let mut last = 0;
        for _ in 0..20 {
            writer.append(b"abc").unwrap();
            assert!(writer.capacity() >= last);
            last = writer.capacity();
        }
    }

    #[test]
    fn test_zero_block_size_is_clamped() {
        let mut writer = DumpWriter::with_block_size(0);
        writer.append(b"x").unwrap();
        writer.append(b"").unwrap();
        assert_eq!(writer.finish(), b"x".to_vec());
    }

    #[test]
    fn test_callback_appends() {
        let mut writer = DumpWriter::new();
        let data = b"chunk\0with\0zeros";
        let status = unsafe {
            write_chunk(
                std::ptr::null_mut(),
                data.as_ptr() as *const c_void,
                data.len(),
                &mut writer as *mut DumpWriter as *mut c_void,
            )
        };
        assert_eq!(status, 0);
        assert_eq!(writer.as_bytes(), &data[..]);
    }
}

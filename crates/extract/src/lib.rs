//! Bounds-checked reading over in-memory byte buffers.
//!
//! Every archive and compression format in this workspace is parsed through a [`ByteCursor`]: a borrowed buffer plus
//! an offset that can never leave `[0, len]`. Reads past the end are reported as a [`ParseError`] instead of panicking,
//! and it is up to the caller to decide whether that is fatal for the whole decode or just for one entry.

use thiserror::Error;


#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("ran out of data reading {len} byte(s) at offset {offset:#x} (buffer is {size:#x} bytes)")]
    EndOfBufferError { offset: usize, len: usize, size: usize },

    #[error("cannot seek to offset {offset:#x}, buffer is only {size:#x} bytes")]
    SeekError { offset: usize, size: usize },

    #[error("invalid range {start:#x}..{end:#x} in a buffer of {size:#x} bytes")]
    InvalidRangeError { start: usize, end: usize, size: usize },
}


/// Interprets a fixed-width field as a null-terminated string (a string-zero, or a `sz`).
///
/// Everything from the first null byte onward is dropped. Bytes are treated as plain 8-bit text (each byte maps to the
/// code point of the same value), so this never fails on non-ASCII data.
pub fn sz_to_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    data[..end].iter().map(|&b| b as char).collect()
}


/// A read position over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    ptr: usize,
}


// --------------------------------------------------------------------------------------------------------------
// Same shape as the old `num_from_bytes!` helpers, but as cursor methods that advance the pointer.
// --------------------------------------------------------------------------------------------------------------

macro_rules! read_num {
    ($func_name:ident, $num:ty, $method_name:ident, $doc_name:literal) => {
        #[doc="Reads"]
        #[doc=$doc_name]
        /// and advances the cursor by its width. Returns an [`EndOfBufferError`][ParseError::EndOfBufferError] if
        /// there are not enough bytes left.
        pub fn $func_name(&mut self) -> Result<$num, ParseError> {
            Ok(<$num>::$method_name(self.read_array()?))
        }
    };
}


impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, ptr: 0 }
    }

    /// The true length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.ptr
    }

    /// The whole underlying buffer, regardless of the cursor's position.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn tell(&self) -> usize {
        self.ptr
    }

    /// Moves the cursor to an absolute position. Seeking exactly to the end is allowed; anything past it is not.
    pub fn seek(&mut self, pos: usize) -> Result<(), ParseError> {
        if pos > self.data.len() {
            return Err(ParseError::SeekError { offset: pos, size: self.data.len() });
        }

        self.ptr = pos;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        let pos = self.ptr.checked_add(len).ok_or(ParseError::SeekError { offset: usize::MAX, size: self.len() })?;
        self.seek(pos)
    }

    /// Reads `len` bytes starting at the cursor, then advances it. Zero-copy.
    pub fn read(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        let res = self
            .ptr
            .checked_add(len)
            .and_then(|end| self.data.get(self.ptr..end))
            .ok_or(ParseError::EndOfBufferError { offset: self.ptr, len, size: self.data.len() })?;
        self.ptr += len;
        Ok(res)
    }

    /// Reads exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read(N)?);
        Ok(buf)
    }

    read_num!(read_u8, u8, from_le_bytes, "a `u8`");
    read_num!(read_u16, u16, from_le_bytes, "a little-endian `u16`");
    read_num!(read_u32, u32, from_le_bytes, "a little-endian `u32`");
    read_num!(read_u32_be, u32, from_be_bytes, "a big-endian `u32`");

    /// Reads `len` bytes as 8-bit text. Nothing is trimmed: the caller decides how the field is terminated (see
    /// [`sz_to_string`] for null-terminated fields).
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, ParseError> {
        Ok(self.read(len)?.iter().map(|&b| b as char).collect())
    }

    /// Borrows `[start, end)` without moving the cursor.
    ///
    /// `end` is clamped to the buffer's true length, since the lengths stored in archive headers are not always right.
    /// A `start` past the end of the buffer, or after `end`, is an error.
    pub fn sub_slice(&self, start: usize, end: usize) -> Result<&'a [u8], ParseError> {
        let size = self.data.len();
        if start > end {
            return Err(ParseError::InvalidRangeError { start, end, size });
        }
        if start > size {
            return Err(ParseError::EndOfBufferError { offset: start, len: end - start, size });
        }

        Ok(&self.data[start..end.min(size)])
    }

    /// Copies `[start, end)` into a new buffer without moving the cursor. Same clamping rules as [`Self::sub_slice`].
    pub fn slice(&self, start: usize, end: usize) -> Result<Vec<u8>, ParseError> {
        self.sub_slice(start, end).map(<[u8]>::to_vec)
    }
}

//! SQLite variable-length integers
//!
//! A varint is 1 to 9 bytes long. The most significant 7-bit group comes
//! first; each of the first eight bytes carries 7 bits of payload plus a
//! continuation flag in its high bit. If all eight carry the flag, the ninth
//! byte contributes all 8 of its bits, which is what makes 64-bit values fit.

use crate::sqlite::error::{FormatError, FormatResult};

/// Maximum encoded length of a varint.
pub const MAX_VARINT_LEN: usize = 9;

/// Decoding of SQLite varints out of a byte buffer
pub trait Varint {
    /// Reads the varint starting at `offset`.
    ///
    /// Returns the decoded value and the number of bytes it occupied.
    fn read_varint(&self, offset: usize) -> FormatResult<(u64, usize)>;
}

impl Varint for [u8] {
    fn read_varint(&self, offset: usize) -> FormatResult<(u64, usize)> {
        let malformed = || FormatError::MalformedVarint {
            offset,
            available: self.len().saturating_sub(offset),
        };

        let mut result = 0u64;
        for i in 0..MAX_VARINT_LEN - 1 {
            let byte = *self.get(offset + i).ok_or_else(malformed)?;
            result = (result << 7) | (byte & 0x7f) as u64;
            if byte & 0x80 == 0 {
                return Ok((result, i + 1));
            }
        }

        // Ninth byte: all 8 bits are payload
        let last = *self
            .get(offset + MAX_VARINT_LEN - 1)
            .ok_or_else(malformed)?;
        Ok(((result << 8) | last as u64, MAX_VARINT_LEN))
    }
}

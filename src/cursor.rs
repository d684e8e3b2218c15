//! Immutable bit cursor over a borrowed byte slice.

use std::fmt::Write as _;

use crate::bits;

/// A `(buffer, offset, remaining_length)` triple.
///
/// `offset` is the absolute bit position of the next unread bit, `len` the
/// number of unread bits from there. `offset + len <= 8 * data.len()` holds for
/// every cursor; all operations return a new cursor instead of mutating.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor over every bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            len: data.len() * 8,
        }
    }

    /// Cursor over `len` bits of `data` starting at bit `offset`.
    pub fn sub(data: &'a [u8], offset: usize, len: usize) -> Option<Self> {
        let end = offset.checked_add(len)?;
        if end > data.len() * 8 {
            return None;
        }

        Some(Self { data, offset, len })
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Remaining bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Skips `n` bits. Returns `None` when fewer than `n` bits remain.
    pub fn advance(&self, n: usize) -> Option<Self> {
        if n > self.len {
            return None;
        }

        Some(Self {
            data: self.data,
            offset: self.offset + n,
            len: self.len - n,
        })
    }

    /// The first `n` bits as a cursor of their own.
    pub fn take(&self, n: usize) -> Option<Self> {
        if n > self.len {
            return None;
        }

        Some(Self {
            data: self.data,
            offset: self.offset,
            len: n,
        })
    }

    /// Cursor positioned after every remaining bit.
    pub fn rest(&self) -> Self {
        Self {
            data: self.data,
            offset: self.offset + self.len,
            len: 0,
        }
    }

    /// Bit `i` of the cursor (0 = next unread bit).
    pub fn bit(&self, i: usize) -> Option<bool> {
        if i >= self.len {
            return None;
        }

        Some(bits::read_bit_at(self.data, self.offset + i) == 1)
    }

    pub fn is_set(&self, i: usize) -> bool {
        self.bit(i) == Some(true)
    }

    pub fn is_clear(&self, i: usize) -> bool {
        self.bit(i) == Some(false)
    }

    /// Reads the first `n` bits (at most 64) as an unsigned MSB-first value.
    pub fn read_bits(&self, n: usize) -> Option<u64> {
        if n > 64 || n > self.len {
            return None;
        }

        Some(bits::read_bits_at(self.data, self.offset, n))
    }

    /// Copies the remaining bits into bytes, zero-padding the last byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.offset % 8 == 0 {
            let start = self.offset / 8;
            let mut out = self.data[start..start + self.len.div_ceil(8)].to_vec();
            if self.len % 8 != 0 {
                if let Some(last) = out.last_mut() {
                    *last &= 0xFFu8 << (8 - self.len % 8);
                }
            }
            return out;
        }

        let mut out = Vec::with_capacity(self.len.div_ceil(8));
        let mut pos = 0;
        while pos < self.len {
            let chunk = (self.len - pos).min(8);
            let byte = bits::read_bits_at(self.data, self.offset + pos, chunk) << (8 - chunk);
            out.push(byte as u8);
            pos += chunk;
        }

        out
    }

    /// Bitwise equality of the remaining bits, regardless of alignment.
    pub fn equals(&self, other: &Cursor<'_>) -> bool {
        if self.len != other.len {
            return false;
        }

        let mut pos = 0;
        while pos < self.len {
            let chunk = (self.len - pos).min(64);
            let a = bits::read_bits_at(self.data, self.offset + pos, chunk);
            let b = bits::read_bits_at(other.data, other.offset + pos, chunk);
            if a != b {
                return false;
            }
            pos += chunk;
        }

        true
    }

    /// Hex dump of the remaining bits, 16 bytes per line, with an ASCII column.
    pub fn hexdump(&self) -> String {
        let bytes = self.to_bytes();
        let mut out = String::new();

        for (line, row) in bytes.chunks(16).enumerate() {
            let _ = write!(out, "{:08x} ", line * 16);
            for i in 0..16 {
                match row.get(i) {
                    Some(b) => {
                        let _ = write!(out, " {b:02x}");
                    }
                    None => out.push_str("   "),
                }
            }
            out.push_str("  |");
            for &b in row {
                out.push(if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                });
            }
            out.push_str("|\n");
        }

        out
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Cursor<'_> {}

//! Append-only bit buffer used by construction.

use crate::{bits, cursor::Cursor};

/// Owned, growable bit buffer. Bits are appended MSB-first.
#[derive(Debug, Clone, Default)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    len_bits: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            len_bits: 0,
        }
    }

    pub fn len_bits(&self) -> usize {
        self.len_bits
    }

    pub fn is_empty(&self) -> bool {
        self.len_bits == 0
    }

    pub fn push_bit(&mut self, bit: bool) {
        if self.len_bits % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len_bits % 8);
        }
        self.len_bits += 1;
    }

    /// Appends the low `n` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u64, n: usize) {
        debug_assert!(n <= 64);

        if self.len_bits % 8 == 0 && n % 8 == 0 {
            let value = bits::mask(value, n);
            for i in (0..n / 8).rev() {
                self.bytes.push((value >> (i * 8)) as u8);
            }
            self.len_bits += n;
            return;
        }

        for i in (0..n).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    pub fn push_bytes(&mut self, data: &[u8]) {
        if self.len_bits % 8 == 0 {
            self.bytes.extend_from_slice(data);
            self.len_bits += data.len() * 8;
            return;
        }

        for &b in data {
            self.push_bits(b as u64, 8);
        }
    }

    /// Appends every remaining bit of `cursor`.
    pub fn push_cursor(&mut self, cursor: &Cursor<'_>) {
        let mut pos = 0;
        while pos < cursor.len() {
            let chunk = (cursor.len() - pos).min(64);
            let value = bits::read_bits_at(cursor.data(), cursor.offset() + pos, chunk);
            self.push_bits(value, chunk);
            pos += chunk;
        }
    }

    pub fn as_cursor(&self) -> Cursor<'_> {
        // The byte vector always covers `len_bits`.
        Cursor::sub(&self.bytes, 0, self.len_bits).unwrap_or_else(|| Cursor::new(&[]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The bytes, with the last byte zero-padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Concatenates bitstrings into a new buffer.
    pub fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Cursor<'a>>,
    {
        let mut out = Self::new();
        for part in parts {
            out.push_cursor(&part);
        }
        out
    }
}

//! Low-level bit read and write utilities for byte slices.
//!
//! Bits are addressed in MSB-first order: bit 0 is the high bit of the first byte.

use crate::qualifier::Endianness;

/// Reads a single bit at `bit_pos` (0 = MSB of first byte). Returns 0 or 1.
///
/// The caller guarantees `bit_pos < data.len() * 8`.
pub fn read_bit_at(data: &[u8], bit_pos: usize) -> u8 {
    let byte_index = bit_pos / 8;
    let bit_index = bit_pos % 8;

    (data[byte_index] >> (7 - bit_index)) & 1
}

/// Reads `n` bits starting at `bit_pos` as an unsigned value, MSB-first.
///
/// The caller guarantees `n <= 64` and that the range lies inside `data`.
pub fn read_bits_at(data: &[u8], bit_pos: usize, n: usize) -> u64 {
    debug_assert!(n <= 64);

    // Byte-aligned fast path.
    if bit_pos % 8 == 0 && n % 8 == 0 {
        let start = bit_pos / 8;
        return data[start..start + n / 8]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64);
    }

    let mut value = 0u64;
    for pos in bit_pos..bit_pos + n {
        value = (value << 1) | read_bit_at(data, pos) as u64;
    }

    value
}

/// Reads `n` bits as an integer in the given byte order.
///
/// Little-endian values are stored as a sequence of 8-bit chunks, least
/// significant first; when `n` is not a multiple of 8 the final, shorter chunk
/// holds the most significant bits.
pub fn read_int_at(data: &[u8], bit_pos: usize, n: usize, endian: Endianness) -> u64 {
    match endian {
        Endianness::Big => read_bits_at(data, bit_pos, n),
        Endianness::Little => {
            let mut value = 0u64;
            let mut shift = 0;
            let mut pos = bit_pos;
            let mut left = n;

            while left > 0 {
                let chunk = left.min(8);
                value |= read_bits_at(data, pos, chunk) << shift;
                shift += chunk;
                pos += chunk;
                left -= chunk;
            }

            value
        }
    }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Keeps the low `bits` of `value`.
pub fn mask(value: u64, bits: usize) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

/// Splits the low `n` bits of `value` into the chunks [`read_int_at`] expects
/// for `endian`, in write order, as `(chunk, chunk_bits)` pairs.
pub fn int_chunks(value: u64, n: usize, endian: Endianness) -> Vec<(u64, usize)> {
    match endian {
        Endianness::Big => vec![(mask(value, n), n)],
        Endianness::Little => {
            let mut chunks = Vec::with_capacity(n.div_ceil(8));
            let mut shift = 0;

            while shift < n {
                let chunk = (n - shift).min(8);
                chunks.push((mask(value >> shift, chunk), chunk));
                shift += chunk;
            }

            chunks
        }
    }
}

//! MSB-first bit arrays over plain byte slices.
//!
//! Bit `i` lives in byte `i / 8` under mask `0x80 >> (i % 8)`. Walking the
//! bytes left to right and each byte from bit 7 down to bit 0 therefore visits
//! bits in ascending index order. Both the record page occupancy header and the
//! file header's page-allocation map use this layout.

/// Mask selecting bit `bit` within its byte.
#[inline]
pub fn mask(bit: usize) -> u8 {
    0x80 >> (bit % 8)
}

/// Returns whether bit `bit` is set.
#[inline]
pub fn get(bits: &[u8], bit: usize) -> bool {
    bits[bit / 8] & mask(bit) != 0
}

/// Sets or clears bit `bit`.
#[inline]
pub fn set(bits: &mut [u8], bit: usize, value: bool) {
    if value {
        bits[bit / 8] |= mask(bit);
    } else {
        bits[bit / 8] &= !mask(bit);
    }
}

/// Returns true if every bit in the slice is set.
pub fn all_set(bits: &[u8]) -> bool {
    bits.iter().all(|&b| b == 0xFF)
}

/// Returns the lowest clear bit, provided it is below `limit`.
pub fn first_clear(bits: &[u8], limit: usize) -> Option<usize> {
    let (index, byte) = bits.iter().enumerate().find(|(_, &b)| b != 0xFF)?;
    let bit = index * 8 + byte.leading_ones() as usize;
    (bit < limit).then_some(bit)
}

/// Returns the lowest set bit in `from..limit`.
pub fn next_set(bits: &[u8], from: usize, limit: usize) -> Option<usize> {
    let end = limit.min(bits.len() * 8);
    if from >= end {
        return None;
    }

    let mut index = from / 8;
    // Drop the bits that precede `from` in its byte
    let mut byte = bits[index] & (0xFF >> (from % 8));
    loop {
        if byte != 0 {
            let bit = index * 8 + byte.leading_zeros() as usize;
            return (bit < end).then_some(bit);
        }
        index += 1;
        if index * 8 >= end {
            return None;
        }
        byte = bits[index];
    }
}

/// Counts the set bits below `limit`.
pub fn count_set(bits: &[u8], limit: usize) -> usize {
    (0..limit.min(bits.len() * 8))
        .filter(|&bit| get(bits, bit))
        .count()
}

//! Two 4-bit codes per byte: the low nibble holds the even index, the high
//! nibble the odd index. This is the exchange format consumed downstream.

use crate::api::types::{CODE_MID, QBITS};
use rayon::prelude::*;

/// Dense bytes covered by one parallel task when packing a flat code run.
const PACK_CHUNK_BYTES: usize = 256;

const NIBBLE_MASK: u8 = (1 << QBITS) - 1;

/// Pack two codes into one byte.
#[inline(always)]
pub fn pack(lo: u8, hi: u8) -> u8 {
    (hi << QBITS) | (lo & NIBBLE_MASK)
}

/// Split a byte into `(lo, hi)` codes.
#[inline(always)]
pub fn unpack(byte: u8) -> (u8, u8) {
    (byte & NIBBLE_MASK, byte >> QBITS)
}

/// Code at nibble index `idx` of a packed run.
#[inline(always)]
pub fn nibble_at(packed: &[u8], idx: usize) -> u8 {
    (packed[idx >> 1] >> ((idx & 1) * QBITS)) & NIBBLE_MASK
}

/// Overwrite the code at nibble index `idx`, leaving its neighbour intact.
#[inline(always)]
pub fn set_nibble(packed: &mut [u8], idx: usize, code: u8) {
    let shift = (idx & 1) * QBITS;
    let byte = &mut packed[idx >> 1];
    *byte = (*byte & !(NIBBLE_MASK << shift)) | ((code & NIBBLE_MASK) << shift);
}

/// Sign-extend a two's-complement nibble.
#[inline(always)]
pub fn signed_from_nibble(nibble: u8) -> i8 {
    ((nibble << QBITS) as i8) >> QBITS
}

/// Two's-complement nibble of a signed code in -8..=7.
#[inline(always)]
pub fn nibble_from_signed(code: i8) -> u8 {
    (code as u8) & NIBBLE_MASK
}

/// Convert between a signed nibble and its +8 biased unsigned form.
///
/// Involution: applying it twice returns the input.
#[inline(always)]
pub fn flip_sign_bias(nibble: u8) -> u8 {
    (nibble ^ CODE_MID) & NIBBLE_MASK
}

/// Pack `count` codes, read in flat order from `code_at`, into `dst` two per
/// byte. Bytes are filled in parallel chunks; the padding nibble is zero.
pub(crate) fn pack_flat_par(dst: &mut [u8], count: usize, code_at: impl Fn(usize) -> u8 + Sync) {
    dst.par_chunks_mut(PACK_CHUNK_BYTES)
        .enumerate()
        .for_each(|(chunk_idx, bytes)| {
            for (j, byte) in bytes.iter_mut().enumerate() {
                let flat = (chunk_idx * PACK_CHUNK_BYTES + j) * 2;
                let hi = if flat + 1 < count { code_at(flat + 1) } else { 0 };
                *byte = pack(code_at(flat), hi);
            }
        });
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Bit packing and block interleaving.
//!
//! Bytes unpack MSB-first. The interleaver treats the bit stream as a
//! row-major `depth x ceil(n/depth)` matrix (zero-padded) and emits it
//! column-major, spreading burst errors across RS symbols.

/// Convert bytes to a bit vector (MSB first within each byte).
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for bit_pos in (0..8).rev() {
            bits.push((byte >> bit_pos) & 1);
        }
    }
    bits
}

/// Convert a bit vector (MSB first) back to bytes.
/// Pads the last byte with zero bits if `bits.len()` is not a multiple of 8.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            byte |= (bit & 1) << (7 - i);
        }
        bytes.push(byte);
    }
    bytes
}

/// Interleave a bit stream with the given depth.
///
/// Fills a `depth`-row matrix row-major and reads it out column-major.
/// Pad cells of a ragged final row are skipped on the way out, so the output
/// has exactly the input length and the operation is invertible for any
/// length and depth.
pub fn interleave(bits: &[u8], depth: usize) -> Vec<u8> {
    assert!(depth >= 1, "interleave depth must be at least 1");
    if depth == 1 || bits.is_empty() {
        return bits.to_vec();
    }

    let cols = bits.len().div_ceil(depth);
    let mut out = Vec::with_capacity(bits.len());
    for col in 0..cols {
        for row in 0..depth {
            let idx = row * cols + col;
            if idx < bits.len() {
                out.push(bits[idx]);
            }
        }
    }
    out
}

/// Exact inverse of [`interleave`] for the same depth.
pub fn deinterleave(bits: &[u8], depth: usize) -> Vec<u8> {
    assert!(depth >= 1, "interleave depth must be at least 1");
    if depth == 1 || bits.is_empty() {
        return bits.to_vec();
    }

    let cols = bits.len().div_ceil(depth);
    let mut out = vec![0u8; bits.len()];
    let mut src = 0usize;
    for col in 0..cols {
        for row in 0..depth {
            let idx = row * cols + col;
            if idx < bits.len() {
                out[idx] = bits[src];
                src += 1;
            }
        }
    }
    out
}

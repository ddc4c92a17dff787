// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Signature frame construction and parsing.
//!
//! The frame is the on-signal container for the 16-byte signature key:
//!
//! ```text
//! [64 bits ] sync preamble (fixed pattern)
//! [16 bits ] payload byte count (big-endian u16, always 16)
//! [384 bits] RS(48,16) codeword, interleaved at depth 8
//! ```
//!
//! One frame period is 464 bits. The frame repeats end-to-end over the audio;
//! the parser locates the preamble with a Hamming-tolerant search, so a
//! handful of corrupted sync bits does not lose the frame.

use crate::mark::bits::{bits_to_bytes, bytes_to_bits, deinterleave, interleave};
use crate::mark::ecc;
use crate::mark::error::MarkError;
use sha2::{Digest, Sha256};

/// Sync preamble, MSB first in each byte.
pub const SYNC_PATTERN: [u8; 8] = [0xAD, 0x52, 0xE6, 0x63, 0x9A, 0x72, 0xB4, 0xCB];

/// Sync preamble width in bits.
pub const SYNC_BITS: usize = 64;

/// Length field width in bits.
pub const LENGTH_BITS: usize = 16;

/// Fixed payload size in bytes (the signature key).
pub const PAYLOAD_BYTES: usize = 16;

/// Row/column interleaver depth over the codeword bits.
pub const INTERLEAVE_DEPTH: usize = 8;

/// Codeword width in bits: 8 * (16 data + 32 parity).
pub const CODEWORD_BITS: usize = 8 * (PAYLOAD_BYTES + ecc::PARITY_LEN);

/// Full frame period in bits: sync + length + codeword.
pub const FRAME_BITS: usize = SYNC_BITS + LENGTH_BITS + CODEWORD_BITS;

/// Sync agreement (out of 64) accepted immediately at the first match.
const SYNC_ACCEPT: usize = 55;

/// Minimum agreement for the best-match fallback.
const SYNC_FALLBACK: usize = 38;

/// A successfully parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    /// The recovered 16-byte signature key.
    pub key: [u8; PAYLOAD_BYTES],
    /// SHA-256 of the key bytes, for store-less verification.
    pub key_hash: [u8; 32],
    /// Byte errors the RS decoder corrected.
    pub rs_errors: usize,
}

/// Build the 464-bit frame for a signature key.
pub fn build_frame(key: &[u8; PAYLOAD_BYTES]) -> Vec<u8> {
    let codeword = ecc::rs_encode(key);
    let codeword_bits = interleave(&bytes_to_bits(&codeword), INTERLEAVE_DEPTH);

    let mut frame = Vec::with_capacity(FRAME_BITS);
    frame.extend_from_slice(&bytes_to_bits(&SYNC_PATTERN));
    frame.extend_from_slice(&bytes_to_bits(&(PAYLOAD_BYTES as u16).to_be_bytes()));
    frame.extend_from_slice(&codeword_bits);
    debug_assert_eq!(frame.len(), FRAME_BITS);
    frame
}

/// Locate the sync preamble in a candidate bit vector.
///
/// Slides the 64-bit pattern across `bits` counting Hamming agreement.
/// The first offset reaching [`SYNC_ACCEPT`] wins outright; otherwise the
/// best offset is used if it reaches [`SYNC_FALLBACK`].
fn find_sync(bits: &[u8]) -> Result<usize, MarkError> {
    if bits.len() < SYNC_BITS {
        return Err(MarkError::NoSync);
    }
    let pattern = bytes_to_bits(&SYNC_PATTERN);

    let mut best_offset = 0usize;
    let mut best_score = 0usize;
    for offset in 0..=(bits.len() - SYNC_BITS) {
        let score = pattern
            .iter()
            .zip(&bits[offset..offset + SYNC_BITS])
            .filter(|(a, b)| a == b)
            .count();
        if score >= SYNC_ACCEPT {
            return Ok(offset);
        }
        if score > best_score {
            best_score = score;
            best_offset = offset;
        }
    }

    if best_score >= SYNC_FALLBACK {
        log::debug!("sync fallback match at {best_offset} with {best_score}/64 agreement");
        Ok(best_offset)
    } else {
        Err(MarkError::NoSync)
    }
}

/// Parse a candidate bit vector into a [`ParsedFrame`].
///
/// # Errors
/// - [`MarkError::NoSync`] if no offset reaches the fallback agreement.
/// - [`MarkError::WrongPayloadSize`] if the vector cannot hold the length
///   field or the codeword the length field announces.
/// - [`MarkError::UnsupportedLength`] if the length field is not 16.
/// - [`MarkError::UncorrectableCodeword`] if RS decoding fails.
pub fn parse_frame(bits: &[u8]) -> Result<ParsedFrame, MarkError> {
    let start = find_sync(bits)?;

    let length_end = start + SYNC_BITS + LENGTH_BITS;
    if bits.len() < length_end {
        return Err(MarkError::WrongPayloadSize {
            have_bits: bits.len() - (start + SYNC_BITS),
            need_bits: LENGTH_BITS,
        });
    }

    let length_bytes = bits_to_bytes(&bits[start + SYNC_BITS..length_end]);
    let length = u16::from_be_bytes([length_bytes[0], length_bytes[1]]);
    if length as usize != PAYLOAD_BYTES {
        return Err(MarkError::UnsupportedLength(length));
    }

    let codeword_bits = 8 * (length as usize + ecc::PARITY_LEN);
    if bits.len() < length_end + codeword_bits {
        return Err(MarkError::WrongPayloadSize {
            have_bits: bits.len() - length_end,
            need_bits: codeword_bits,
        });
    }

    let interleaved = &bits[length_end..length_end + codeword_bits];
    let codeword = bits_to_bytes(&deinterleave(interleaved, INTERLEAVE_DEPTH));

    let decoded = ecc::rs_decode(&codeword);
    if !decoded.corrected {
        return Err(MarkError::UncorrectableCodeword {
            errors: decoded.errors,
        });
    }

    let mut key = [0u8; PAYLOAD_BYTES];
    key.copy_from_slice(&decoded.data);

    let key_hash: [u8; 32] = Sha256::digest(key).into();

    Ok(ParsedFrame {
        key,
        key_hash,
        rs_errors: decoded.errors,
    })
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Spread-spectrum embedder.
//!
//! Walks the signal in blocks of `samples_per_bit` samples, one frame bit per
//! block, and adds the position-matching PN carrier with bipolar modulation:
//! bit 1 adds the carrier, bit 0 subtracts it. The gain adapts to local block
//! energy — loud blocks mask more, silent blocks reveal artifacts — clamped
//! to the [0.1, 0.6] multiplier band around `4 * rms`.
//!
//! For re-signing, a removal bitstream subtracts the prior watermark's
//! contribution in the same pass, at the same adaptive gain.

use crate::mark::carrier::CarrierBank;
use crate::mark::frame::FRAME_BITS;

/// Embed a repeating 464-bit frame into a stereo pair in place.
///
/// Blocks are laid out from sample 0; a trailing partial block is left
/// untouched. Both channels receive the same delta, so the mid channel the
/// extractor correlates against carries the full watermark. Returns the
/// number of blocks written.
///
/// # Panics
/// Panics if `bits` (or a removal bitstream) is not exactly one frame period,
/// or if the channels differ in length.
pub fn embed(
    left: &mut [f32],
    right: &mut [f32],
    bank: &CarrierBank,
    bits: &[u8],
    remove_bits: Option<&[u8]>,
    base_strength: f64,
) -> usize {
    assert_eq!(bits.len(), FRAME_BITS, "bitstream must be one frame period");
    if let Some(rb) = remove_bits {
        assert_eq!(rb.len(), FRAME_BITS, "removal bitstream must be one frame period");
    }
    assert_eq!(left.len(), right.len(), "channel length mismatch");

    let spb = bank.samples_per_bit();
    let total = left.len();

    let mut block = 0usize;
    let mut start = 0usize;
    while start + spb <= total {
        let pos = block % FRAME_BITS;
        let sign = if bits[pos] != 0 { 1.0 } else { -1.0 };
        let carrier = bank.carrier(pos);

        let mut energy = 0.0f64;
        for i in 0..spb {
            let mid = (left[start + i] as f64 + right[start + i] as f64) * 0.5;
            energy += mid * mid;
        }
        let local_rms = (energy / spb as f64).sqrt();
        let gain = base_strength * (local_rms * 4.0).clamp(0.1, 0.6);

        let remove_sign = remove_bits.map(|rb| if rb[pos] != 0 { 1.0 } else { -1.0 });

        for i in 0..spb {
            let mut delta = carrier[i] * sign * gain;
            if let Some(old_sign) = remove_sign {
                delta -= carrier[i] * old_sign * gain;
            }
            left[start + i] += delta as f32;
            right[start + i] += delta as f32;
        }

        block += 1;
        start += spb;
    }

    log::debug!("embedded {block} blocks ({spb} samples each, gain base {base_strength})");
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mark::frame::build_frame;

    const KEY: [u8; 16] = [
        0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
        0x00,
    ];

    #[test]
    fn writes_whole_blocks_only() {
        let bank = CarrierBank::build("s", 256);
        let bits = build_frame(&KEY);
        // 3 blocks plus a 100-sample tail.
        let mut left = vec![0.0f32; 3 * 256 + 100];
        let mut right = left.clone();
        let blocks = embed(&mut left, &mut right, &bank, &bits, None, 0.007);
        assert_eq!(blocks, 3);
        // The tail stays silent.
        assert!(left[3 * 256..].iter().all(|&v| v == 0.0));
        // The body does not.
        assert!(left[..3 * 256].iter().any(|&v| v != 0.0));
    }

    #[test]
    fn channels_get_identical_delta() {
        let bank = CarrierBank::build("s", 256);
        let bits = build_frame(&KEY);
        let mut left = vec![0.0f32; 1024];
        let mut right = vec![0.0f32; 1024];
        embed(&mut left, &mut right, &bank, &bits, None, 0.007);
        assert_eq!(left, right);
    }

    #[test]
    fn silence_uses_floor_gain() {
        let bank = CarrierBank::build("s", 256);
        let bits = build_frame(&KEY);
        let mut left = vec![0.0f32; 256];
        let mut right = vec![0.0f32; 256];
        embed(&mut left, &mut right, &bank, &bits, None, 0.007);

        // gain = 0.007 * 0.1 on silence; the written block is the scaled carrier.
        let expected_gain = 0.007 * 0.1;
        let sign = if bits[0] != 0 { 1.0 } else { -1.0 };
        for (i, &v) in left.iter().enumerate() {
            let expected = (bank.carrier(0)[i] * sign * expected_gain) as f32;
            assert!((v - expected).abs() < 1e-12, "sample {i}");
        }
    }

    #[test]
    fn removal_of_same_bits_is_identity() {
        let bank = CarrierBank::build("s", 256);
        let bits = build_frame(&KEY);
        let mut left = vec![0.01f32; 1024];
        let mut right = vec![0.01f32; 1024];
        let before = left.clone();
        embed(&mut left, &mut right, &bank, &bits, Some(&bits), 0.007);
        assert_eq!(left, before);
        assert_eq!(right, before);
    }

    #[test]
    fn resign_replaces_prior_watermark_on_silence() {
        let bank = CarrierBank::build("s", 256);
        let old_key = KEY;
        let new_key: [u8; 16] = [7u8; 16];
        let old_bits = build_frame(&old_key);
        let new_bits = build_frame(&new_key);

        let frames = 8 * 256;
        let mut left = vec![0.0f32; frames];
        let mut right = vec![0.0f32; frames];
        embed(&mut left, &mut right, &bank, &old_bits, None, 0.007);
        embed(&mut left, &mut right, &bank, &new_bits, Some(&old_bits), 0.007);

        // On silence both passes clamp to the floor gain, so the replacement
        // is exact: the result equals a fresh embedding of the new bits.
        let mut fresh_l = vec![0.0f32; frames];
        let mut fresh_r = vec![0.0f32; frames];
        embed(&mut fresh_l, &mut fresh_r, &bank, &new_bits, None, 0.007);
        for i in 0..frames {
            assert!(
                (left[i] - fresh_l[i]).abs() < 1e-6,
                "sample {i}: {} vs {}",
                left[i],
                fresh_l[i]
            );
        }
    }
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Position-folded soft voting and the detection confidence score.
//!
//! The frame repeats every 464 blocks. Audio-derived noise at a given frame
//! position is uncorrelated across repetitions and averages toward zero,
//! while the watermark is phase-coherent and adds constructively — so
//! correlations are summed per position *before* the sign decision, not
//! voted on as hard bits.

use crate::mark::frame::FRAME_BITS;

/// Fold correlations modulo the frame period and hard-decide by sign.
///
/// With fewer than two full repetitions there is nothing to fold; the raw
/// correlation signs are emitted as-is and the framing parser's sync search
/// does the rest.
pub fn vote_bits(correlations: &[f64], period: usize) -> Vec<u8> {
    let reps = correlations.len() / period;
    if reps < 2 {
        return correlations.iter().map(|&c| u8::from(c > 0.0)).collect();
    }

    let mut folded = vec![0.0f64; period];
    for rep in 0..reps {
        for (pos, sum) in folded.iter_mut().enumerate() {
            *sum += correlations[rep * period + pos];
        }
    }

    log::debug!("soft vote folded {reps} repetitions of {period} positions");
    folded.iter().map(|&s| u8::from(s > 0.0)).collect()
}

/// Fold correlations with the default frame period.
pub fn vote_frame_bits(correlations: &[f64]) -> Vec<u8> {
    vote_bits(correlations, FRAME_BITS)
}

/// Blend the detection evidence into a 0–100 confidence score.
///
/// Weights: 0.35 mean bit confidence, 0.20 band agreement, 0.20 RS error
/// margin, 0.15 RS success, 0.10 store lookup hit.
pub fn confidence_score(
    bit_confidence: f64,
    band_agreement: f64,
    rs_errors: usize,
    rs_corrected: bool,
    lookup_hit: bool,
) -> u8 {
    let error_margin = (1.0 - rs_errors as f64 / 32.0).max(0.0);
    let rs_term = if rs_corrected { 1.0 } else { 0.0 };
    let hit_term = if lookup_hit { 1.0 } else { 0.0 };
    let score = 100.0
        * (0.35 * bit_confidence
            + 0.20 * band_agreement
            + 0.20 * error_margin
            + 0.15 * rs_term
            + 0.10 * hit_term);
    score.round().clamp(0.0, 100.0) as u8
}

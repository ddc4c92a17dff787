// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Spread-spectrum extractor.
//!
//! Correlates each block's mid channel against the position-matching PN
//! carrier and emits one signed, energy-normalized correlation per block.
//! The extractor never hard-decides bits on its own — the correlations go to
//! the soft voter, which folds them across frame repetitions first.

use crate::mark::carrier::CarrierBank;
use crate::mark::frame::FRAME_BITS;

/// Raw correlation output for one pass over the signal.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// One energy-normalized correlation per block, sign = candidate bit.
    pub correlations: Vec<f64>,
    /// Mean per-block confidence (normalized |correlation|, clamped to 1).
    pub bit_confidence: f64,
    /// Number of whole blocks analyzed.
    pub blocks_analyzed: usize,
}

/// Correlate a stereo pair against the carrier bank.
///
/// # Panics
/// Panics if the channels differ in length.
pub fn extract(left: &[f32], right: &[f32], bank: &CarrierBank) -> Extraction {
    assert_eq!(left.len(), right.len(), "channel length mismatch");

    let spb = bank.samples_per_bit();
    let total = left.len();

    let mut correlations = Vec::with_capacity(total / spb);
    let mut confidence_sum = 0.0f64;

    let mut block = 0usize;
    let mut start = 0usize;
    while start + spb <= total {
        let carrier = bank.carrier(block % FRAME_BITS);

        let mut raw = 0.0f64;
        let mut signal_energy = 0.0f64;
        let mut pn_energy = 0.0f64;
        for i in 0..spb {
            let mid = (left[start + i] as f64 + right[start + i] as f64) * 0.5;
            raw += mid * carrier[i];
            signal_energy += mid * mid;
            pn_energy += carrier[i] * carrier[i];
        }

        let normalized = if signal_energy > 1e-20 {
            raw / signal_energy.sqrt()
        } else {
            0.0
        };
        correlations.push(normalized);

        let conf = if signal_energy > 1e-20 && pn_energy > 1e-20 {
            (raw.abs() / (signal_energy * pn_energy).sqrt()).min(1.0)
        } else {
            0.0
        };
        confidence_sum += conf;

        block += 1;
        start += spb;
    }

    let bit_confidence = if block > 0 {
        confidence_sum / block as f64
    } else {
        0.0
    };

    log::debug!("extracted {block} block correlations, mean confidence {bit_confidence:.3}");

    Extraction {
        correlations,
        bit_confidence,
        blocks_analyzed: block,
    }
}

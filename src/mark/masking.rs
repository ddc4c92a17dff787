// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Psychoacoustic masking analysis (ISO/IEC 11172-3 style).
//!
//! Estimates, per FFT bin, the level below which an added signal stays
//! inaudible: the maximum of the absolute threshold of hearing and the
//! masking contributed by tonal peaks, spread across the Bark scale.
//!
//! This is an analysis layer only. The shipped embedder is time-domain and
//! uses a block-energy gain rule instead; a frequency-domain variant would
//! shape its per-bin gain from this threshold.

use num_complex::Complex;

/// Convert frequency (Hz) to Bark scale (critical band rate).
pub fn freq_to_bark(freq: f64) -> f64 {
    13.0 * (0.00076 * freq).atan() + 3.5 * (freq / 7500.0).powi(2).atan()
}

/// Absolute threshold of hearing in dB SPL (Terhardt approximation).
///
/// Out-of-range frequencies (< 20 Hz or > 20 kHz) return 100 dB: nothing
/// there needs masking.
pub fn absolute_threshold_of_hearing(freq_hz: f64) -> f64 {
    let f = freq_hz / 1000.0;
    if !(0.02..=20.0).contains(&f) {
        return 100.0;
    }
    3.64 * f.powf(-0.8) - 6.5 * (-0.6 * (f - 3.3).powi(2)).exp() + 0.001 * f.powi(4)
}

/// Bark-domain spreading function in dB.
///
/// Asymmetric: a masker masks upward (higher frequencies) more strongly than
/// downward. No effect beyond 8 Bark.
pub fn spreading_function(delta_bark: f64) -> f64 {
    if delta_bark.abs() > 8.0 {
        return -100.0;
    }
    let base = 15.81 + 7.5 * (delta_bark + 0.474)
        - 17.5 * (1.0 + (delta_bark + 0.474).powi(2)).sqrt();
    if delta_bark >= 0.0 {
        base
    } else {
        base + 8.0 * delta_bark.abs()
    }
}

/// Per-bin masking threshold (dB) for the first half of an FFT frame.
///
/// Finds tonal maskers as local spectral peaks at least 6 dB above their
/// ±2-bin neighbors and above a −40 dB floor, spreads each across the Bark
/// axis with a tonal offset, combines masker contributions in the power
/// domain, and takes the max with the absolute threshold of hearing.
pub fn masking_threshold(spectrum: &[Complex<f64>], sample_rate: u32) -> Vec<f64> {
    let n = spectrum.len();
    let half_n = n / 2;
    let bin_freq_step = sample_rate as f64 / n as f64;

    let mut power = vec![0.0f64; half_n];
    let mut power_db = vec![0.0f64; half_n];
    let mut bark = vec![0.0f64; half_n];
    for i in 0..half_n {
        let mag = spectrum[i].norm();
        power[i] = mag * mag;
        power_db[i] = 10.0 * power[i].max(1e-20).log10();
        bark[i] = freq_to_bark(i as f64 * bin_freq_step);
    }

    // Tonal maskers: local peaks standing 6 dB proud of their ±2 neighbors.
    let mut masker_bark = Vec::new();
    let mut masker_power_db = Vec::new();
    for i in 2..half_n.saturating_sub(2) {
        if power_db[i] > power_db[i - 1]
            && power_db[i] > power_db[i + 1]
            && power_db[i] > power_db[i - 2] + 6.0
            && power_db[i] > power_db[i + 2] + 6.0
            && power_db[i] > -40.0
        {
            masker_bark.push(bark[i]);
            let combined = power[i - 1] + power[i] + power[i + 1];
            masker_power_db.push(10.0 * combined.max(1e-20).log10());
        }
    }

    let mut threshold = vec![-100.0f64; half_n];
    for i in 1..half_n {
        let freq = i as f64 * bin_freq_step;
        let ath = absolute_threshold_of_hearing(freq);

        let mut masker_contribution = -100.0f64;
        for (m, &mb) in masker_bark.iter().enumerate() {
            let spread = spreading_function(bark[i] - mb);
            let tonal_offset = -6.025 - 0.275 * mb;
            let individual = masker_power_db[m] + spread + tonal_offset;
            if individual > masker_contribution {
                masker_contribution = 10.0
                    * (10f64.powf(masker_contribution / 10.0) + 10f64.powf(individual / 10.0))
                        .log10();
            }
        }

        threshold[i] = ath.max(masker_contribution);
    }

    threshold
}

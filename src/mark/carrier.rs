// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Secret-keyed pseudo-noise carrier bank.
//!
//! Each of the 464 frame bit positions gets its own carrier waveform derived
//! from (secret, position). Position-dependent carriers are the load-bearing
//! trick of the whole codec: the audio's natural correlation with any single
//! carrier becomes *different* noise at every position, so it averages toward
//! zero across frame repetitions while the watermark adds coherently.
//!
//! The seed pipeline (FNV-1a over the secret, xorshift64 per position) is
//! fixed bit-for-bit so the watermark format stays portable across
//! implementations. Carrier shaping — low-pass smoothing, DC removal, energy
//! normalization, Hann taper — runs in `f64`; single-precision carriers
//! diverge and must not be substituted.

use crate::mark::frame::FRAME_BITS;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;

/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x100000001b3;

/// 64-bit golden-ratio constant: position seed spacing and the zero-seed
/// substitute.
const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

/// Half-width of the low-pass boxcar (window = 65 samples).
const LOWPASS_HALF: usize = 32;

/// Half-width of the DC-removal boxcar (window = 513 samples).
const DC_HALF: usize = 256;

/// FNV-1a 64-bit hash of the secret, byte by byte.
pub fn hash_secret(secret: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in secret.as_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// xorshift64 PRNG with (13, 7, 17) shifts.
///
/// A zero seed would stall the generator, so it is replaced by the
/// golden-ratio constant.
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { GOLDEN_GAMMA } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform double in [0, 1): top 53 bits scaled by 2^-53.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / 9007199254740992.0)
    }
}

/// Clamped-window boxcar mean: for each index the mean over
/// `[i - half, i + half]` intersected with the array, divided by the number
/// of samples actually included. Computed with a prefix-sum in O(n).
fn boxcar_mean(src: &[f64], half: usize) -> Vec<f64> {
    let n = src.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &v in src {
        acc += v;
        prefix.push(acc);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            (prefix[hi + 1] - prefix[lo]) / (hi - lo + 1) as f64
        })
        .collect()
}

/// Build one carrier for a (secret-hash, position) pair.
///
/// Transform order: bipolar PN draw, low-pass boxcar, DC-removal boxcar,
/// energy normalization (skipped below 1e-10), Hann taper.
fn build_carrier(base_seed: u64, position: usize, len: usize) -> Vec<f64> {
    let seed = base_seed ^ (position as u64).wrapping_mul(GOLDEN_GAMMA);
    let mut prng = XorShift64::new(seed);

    let raw: Vec<f64> = (0..len).map(|_| prng.next_f64() * 2.0 - 1.0).collect();

    let mut carrier = boxcar_mean(&raw, LOWPASS_HALF);

    let dc = boxcar_mean(&carrier, DC_HALF);
    for (c, d) in carrier.iter_mut().zip(&dc) {
        *c -= d;
    }

    let energy: f64 = carrier.iter().map(|v| v * v).sum();
    let norm = (energy / len as f64).sqrt();
    if norm > 1e-10 {
        for v in carrier.iter_mut() {
            *v /= norm;
        }
    }

    for (i, v) in carrier.iter_mut().enumerate() {
        let window = 0.5 * (1.0 - (std::f64::consts::TAU * i as f64 / (len - 1) as f64).cos());
        *v *= window;
    }

    carrier
}

/// The full bank: one carrier per frame bit position.
///
/// Deterministic in (secret, samples_per_bit); built once per sign or detect
/// call and indexed by `block_index % FRAME_BITS`.
pub struct CarrierBank {
    samples_per_bit: usize,
    carriers: Vec<Vec<f64>>,
}

impl CarrierBank {
    /// Generate all 464 carriers for a secret.
    ///
    /// With the `parallel` feature the positions fan out across threads;
    /// each carrier depends only on its own seed, so the result is
    /// bit-identical to the serial build.
    pub fn build(secret: &str, samples_per_bit: usize) -> Self {
        assert!(samples_per_bit >= 2, "carrier length too short");
        let base_seed = hash_secret(secret);

        #[cfg(feature = "parallel")]
        let carriers: Vec<Vec<f64>> = (0..FRAME_BITS)
            .into_par_iter()
            .map(|pos| build_carrier(base_seed, pos, samples_per_bit))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let carriers: Vec<Vec<f64>> = (0..FRAME_BITS)
            .map(|pos| build_carrier(base_seed, pos, samples_per_bit))
            .collect();

        log::trace!(
            "carrier bank ready: {} carriers x {} samples, pn[0] sum={:.6}",
            carriers.len(),
            samples_per_bit,
            carriers[0].iter().sum::<f64>()
        );

        Self {
            samples_per_bit,
            carriers,
        }
    }

    /// Samples spanned by one carrier (one frame bit).
    pub fn samples_per_bit(&self) -> usize {
        self.samples_per_bit
    }

    /// The carrier for a frame bit position in [0, 464).
    pub fn carrier(&self, position: usize) -> &[f64] {
        &self.carriers[position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_values() {
        // Standard FNV-1a 64-bit test vectors.
        assert_eq!(hash_secret(""), 0xcbf29ce484222325);
        assert_eq!(hash_secret("a"), 0xaf63dc4c8601ec8c);
        assert_eq!(hash_secret("foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn xorshift_sequence() {
        let mut prng = XorShift64::new(1);
        // First outputs of xorshift64(13,7,17) from state 1.
        assert_eq!(prng.next_u64(), 1082269761);
        assert_eq!(prng.next_u64(), 1152992998833853505);
    }

    #[test]
    fn xorshift_zero_seed_substituted() {
        let mut zero = XorShift64::new(0);
        let mut golden = XorShift64::new(GOLDEN_GAMMA);
        assert_eq!(zero.next_u64(), golden.next_u64());
    }

    #[test]
    fn next_f64_in_unit_interval() {
        let mut prng = XorShift64::new(42);
        for _ in 0..1000 {
            let v = prng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn boxcar_mean_clamps_edges() {
        let src = vec![1.0, 2.0, 3.0, 4.0];
        let out = boxcar_mean(&src, 1);
        assert!((out[0] - 1.5).abs() < 1e-12); // mean(1,2)
        assert!((out[1] - 2.0).abs() < 1e-12); // mean(1,2,3)
        assert!((out[3] - 3.5).abs() < 1e-12); // mean(3,4)
    }

    #[test]
    fn bank_is_reproducible_bit_exact() {
        let a = CarrierBank::build("test-secret", 512);
        let b = CarrierBank::build("test-secret", 512);
        for pos in [0usize, 1, 63, 463] {
            let ca: Vec<u64> = a.carrier(pos).iter().map(|v| v.to_bits()).collect();
            let cb: Vec<u64> = b.carrier(pos).iter().map(|v| v.to_bits()).collect();
            assert_eq!(ca, cb, "position {pos}");
        }
    }

    #[test]
    fn different_secrets_differ() {
        let a = CarrierBank::build("secret-a", 512);
        let b = CarrierBank::build("secret-b", 512);
        assert_ne!(
            a.carrier(0).iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.carrier(0).iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn different_positions_differ() {
        let bank = CarrierBank::build("test-secret", 512);
        assert_ne!(
            bank.carrier(0).iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            bank.carrier(1).iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn carrier_statistics_within_envelope() {
        let bank = CarrierBank::build("test-secret", 4096);
        for pos in [0usize, 100, 463] {
            let c = bank.carrier(pos);
            let mean: f64 = c.iter().sum::<f64>() / c.len() as f64;
            let rms = (c.iter().map(|v| v * v).sum::<f64>() / c.len() as f64).sqrt();
            // DC removal keeps the residual mean small; the Hann taper takes
            // the unit RMS down by roughly sqrt(3/8).
            assert!(mean.abs() < 1e-2, "pos {pos}: mean {mean}");
            assert!((0.35..1.0).contains(&rms), "pos {pos}: rms {rms}");
        }
    }

    #[test]
    fn carrier_endpoints_tapered() {
        let bank = CarrierBank::build("test-secret", 1024);
        let c = bank.carrier(7);
        assert_eq!(c[0], 0.0);
        assert!(c[1023].abs() < 1e-12);
    }
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! In-place radix-2 FFT over `Complex<f64>`.
//!
//! Backs the spectral analysis layer ([`crate::mark::masking`]); the
//! time-domain codec itself never transforms anything. Power-of-two lengths
//! only — analysis frames are sized by the caller.

use num_complex::Complex;

/// Bit-reversal permutation.
fn bit_reverse(data: &mut [Complex<f64>]) {
    let n = data.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            data.swap(i, j);
        }
    }
}

fn transform(data: &mut [Complex<f64>], inverse: bool) {
    let n = data.len();
    assert!(n.is_power_of_two(), "FFT length must be a power of two");
    bit_reverse(data);

    let mut len = 2usize;
    while len <= n {
        let ang = std::f64::consts::TAU / len as f64 * if inverse { 1.0 } else { -1.0 };
        let wlen = Complex::new(ang.cos(), ang.sin());

        let mut i = 0usize;
        while i < n {
            let mut w = Complex::new(1.0, 0.0);
            for j in 0..len / 2 {
                let u = data[i + j];
                let v = data[i + j + len / 2] * w;
                data[i + j] = u + v;
                data[i + j + len / 2] = u - v;
                w *= wlen;
            }
            i += len;
        }
        len <<= 1;
    }

    if inverse {
        let scale = 1.0 / n as f64;
        for v in data.iter_mut() {
            *v *= scale;
        }
    }
}

/// Forward FFT, in place.
pub fn fft(data: &mut [Complex<f64>]) {
    transform(data, false);
}

/// Inverse FFT, in place (normalized by 1/n).
pub fn ifft(data: &mut [Complex<f64>]) {
    transform(data, true);
}

/// Multiply a real buffer by a Hann window in place.
pub fn apply_hann(buffer: &mut [f64]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    for (i, v) in buffer.iter_mut().enumerate() {
        let w = 0.5 * (1.0 - (std::f64::consts::TAU * i as f64 / (n - 1) as f64).cos());
        *v *= w;
    }
}

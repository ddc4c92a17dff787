// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Reed-Solomon error correction over GF(2^8).
//!
//! Implements the systematic RS(k+32, k) code protecting the signature key:
//! GF(2^8) with the primitive polynomial 0x11D, generator built from the
//! consecutive roots alpha^0 .. alpha^31, Berlekamp-Massey decoding with
//! Chien search and the Forney algorithm. The codeword is short (48 bytes
//! for the 16-byte key), so no 255-symbol padding is needed: syndrome
//! evaluation on the short word is identical to the zero-extended one.
//!
//! Decoding never returns an error for a bad codeword. It reports
//! `corrected = false` alongside the raw data prefix, and the framing layer
//! decides what that means.

/// Primitive polynomial for GF(2^8): x^8 + x^4 + x^3 + x^2 + 1 = 0x11D.
const PRIM_POLY: u16 = 0x11D;

/// Parity symbols appended to the payload.
pub const PARITY_LEN: usize = 32;

// --- GF(2^8) Arithmetic ---

/// Precomputed log and exp tables for GF(2^8).
///
/// `exp` is doubled to 512 entries so a log-domain product needs no modular
/// reduction before lookup.
struct GfTables {
    exp: [u8; 512],
    log: [u8; 256],
}

fn build_gf_tables() -> GfTables {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];

    let mut x: u16 = 1;
    for i in 0..255u16 {
        exp[i as usize] = x as u8;
        exp[(i + 255) as usize] = x as u8; // wrap-around for easy modular access
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIM_POLY;
        }
    }
    // log[0] is undefined (log of 0 doesn't exist), leave as 0
    exp[510] = exp[0];
    exp[511] = exp[1];

    GfTables { exp, log }
}

fn gf_tables() -> &'static GfTables {
    use std::sync::OnceLock;
    static TABLES: OnceLock<GfTables> = OnceLock::new();
    TABLES.get_or_init(build_gf_tables)
}

/// GF(2^8) addition (same as XOR).
fn gf_add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// GF(2^8) multiplication.
fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = gf_tables();
    let log_sum = t.log[a as usize] as usize + t.log[b as usize] as usize;
    t.exp[log_sum]
}

/// GF(2^8) division. Division by zero is an internal invariant violation:
/// it cannot occur on any input reachable from the public API.
fn gf_div(a: u8, b: u8) -> u8 {
    assert_ne!(b, 0, "division by zero in GF(2^8)");
    if a == 0 {
        return 0;
    }
    let t = gf_tables();
    let idx = (t.log[a as usize] as usize + 255 - t.log[b as usize] as usize) % 255;
    t.exp[idx]
}

/// GF(2^8) multiplicative inverse. Panics if a == 0.
fn gf_inv(a: u8) -> u8 {
    gf_div(1, a)
}

/// GF(2^8) power: a^n.
#[cfg(test)]
fn gf_pow(a: u8, n: u32) -> u8 {
    if a == 0 {
        return if n == 0 { 1 } else { 0 };
    }
    let t = gf_tables();
    let exp_idx = (t.log[a as usize] as u32 * n) % 255;
    t.exp[exp_idx as usize]
}

/// Evaluate polynomial at x. poly[0] is the highest-degree coefficient.
fn poly_eval(poly: &[u8], x: u8) -> u8 {
    let mut result = 0u8;
    for &coeff in poly {
        result = gf_add(gf_mul(result, x), coeff);
    }
    result
}

/// Evaluate polynomial in ascending power format at x.
fn eval_asc(poly: &[u8], x: u8) -> u8 {
    let mut result = 0u8;
    let mut x_pow = 1u8;
    for &coeff in poly {
        result = gf_add(result, gf_mul(coeff, x_pow));
        x_pow = gf_mul(x_pow, x);
    }
    result
}

/// Multiply two polynomials. poly[0] is the highest-degree coefficient.
fn poly_mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut result = vec![0u8; a.len() + b.len() - 1];
    for (i, &ac) in a.iter().enumerate() {
        for (j, &bc) in b.iter().enumerate() {
            result[i + j] = gf_add(result[i + j], gf_mul(ac, bc));
        }
    }
    result
}

// --- Generator Polynomial ---

/// Build the RS generator polynomial g(x) = prod_{i=0}^{nsym-1} (x - alpha^i).
/// Returns coefficients from highest to lowest degree.
fn build_gen_poly(nsym: usize) -> Vec<u8> {
    let t = gf_tables();
    let mut gpoly = vec![1u8];
    for i in 0..nsym {
        gpoly = poly_mul(&gpoly, &[1, t.exp[i]]);
    }
    gpoly
}

fn gen_poly() -> &'static Vec<u8> {
    use std::sync::OnceLock;
    static GEN: OnceLock<Vec<u8>> = OnceLock::new();
    GEN.get_or_init(|| build_gen_poly(PARITY_LEN))
}

// --- Encoding ---

/// RS-encode a data block (systematic encoding with [`PARITY_LEN`] parity bytes).
///
/// Polynomial long division: the data is zero-extended by `PARITY_LEN` bytes,
/// the running remainder is folded in with XOR, and the data prefix is
/// restored afterwards. Output = data || parity.
pub fn rs_encode(data: &[u8]) -> Vec<u8> {
    let gen = gen_poly();
    let mut out = vec![0u8; data.len() + PARITY_LEN];
    out[..data.len()].copy_from_slice(data);

    for i in 0..data.len() {
        let coef = out[i];
        if coef != 0 {
            for j in 1..gen.len() {
                out[i + j] = gf_add(out[i + j], gf_mul(gen[j], coef));
            }
        }
    }

    out[..data.len()].copy_from_slice(data);
    out
}

// --- Decoding ---

/// Outcome of an RS decode attempt.
///
/// `corrected = false` means the decoder located no usable error pattern
/// (zero or too many positions, locator/position mismatch, or a failed
/// post-correction syndrome check); `data` then holds the raw prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsDecoded {
    /// The data prefix of the (possibly corrected) codeword.
    pub data: Vec<u8>,
    /// Whether the codeword was clean or successfully corrected.
    pub corrected: bool,
    /// Number of byte errors corrected (0 for a clean codeword).
    pub errors: usize,
}

/// Compute syndromes S_0 .. S_{nsym-1}: S_i = msg(alpha^i).
///
/// Leading zeros do not change a Horner evaluation, so evaluating the short
/// codeword directly equals evaluating the virtual 255-symbol word.
fn compute_syndromes(msg: &[u8]) -> Vec<u8> {
    let t = gf_tables();
    (0..PARITY_LEN).map(|i| poly_eval(msg, t.exp[i])).collect()
}

/// Berlekamp-Massey algorithm.
///
/// Iteratively grows the error locator, tracking the auxiliary polynomial
/// from the last length change; the discrepancy is the convolution of the
/// current locator with the syndromes, and locator/auxiliary are swapped and
/// scaled whenever the degree grows. Returns sigma(x) in ascending power:
/// sigma[0] = 1, sigma[1] = s_1, ...
fn berlekamp_massey(syndromes: &[u8]) -> Vec<u8> {
    let n = syndromes.len();

    let mut c = vec![0u8; n + 1];
    c[0] = 1;
    let mut c_len = 1usize;

    let mut b = vec![0u8; n + 1];
    b[0] = 1;
    let mut b_len = 1usize;

    let mut ell = 0usize; // current error count estimate
    let mut bval = 1u8; // previous discrepancy
    let mut m = 1usize; // steps since last length change

    for r in 0..n {
        let mut delta = syndromes[r];
        for i in 1..c_len {
            delta = gf_add(delta, gf_mul(c[i], syndromes[r - i]));
        }

        if delta == 0 {
            m += 1;
            continue;
        }

        let factor = gf_mul(delta, gf_inv(bval));

        if 2 * ell <= r {
            let old_c = c.clone();
            let old_c_len = c_len;

            c_len = (b_len + m).max(c_len);
            for j in 0..b_len {
                c[j + m] = gf_add(c[j + m], gf_mul(factor, b[j]));
            }

            b[..old_c_len].copy_from_slice(&old_c[..old_c_len]);
            for slot in b.iter_mut().skip(old_c_len) {
                *slot = 0;
            }
            b_len = old_c_len;
            ell = r + 1 - ell;
            bval = delta;
            m = 1;
        } else {
            c_len = (b_len + m).max(c_len);
            for j in 0..b_len {
                c[j + m] = gf_add(c[j + m], gf_mul(factor, b[j]));
            }
            m += 1;
        }
    }

    let mut sigma = c[..c_len].to_vec();
    while sigma.len() > 1 && *sigma.last().unwrap() == 0 {
        sigma.pop();
    }
    sigma
}

/// Chien search over the short codeword.
///
/// sigma(x) has roots at X_l^{-1} with X_l = alpha^{len-1-k} for an error at
/// array index k, so testing alpha^{-p} for p in [0, len) visits exactly the
/// exponents a short codeword can produce. Returns (gf_pos, array_pos) pairs.
fn chien_search(sigma: &[u8], len: usize) -> Vec<(usize, usize)> {
    let t = gf_tables();
    let mut found = Vec::with_capacity(sigma.len() - 1);

    for p in 0..len {
        let x = if p == 0 {
            1u8
        } else {
            t.exp[(255 - (p % 255)) % 255] // alpha^{-p}
        };
        if eval_asc(sigma, x) == 0 {
            found.push((p, len - 1 - p));
        }
    }

    found
}

/// Forney algorithm: compute error magnitudes.
///
/// Omega(x) = S(x) * sigma(x) mod x^{nsym} (ascending power). The formal
/// derivative of sigma keeps only the odd-degree terms in GF(2^m), and each
/// magnitude is X_l * Omega(X_l^{-1}) / sigma'(X_l^{-1}).
fn forney(sigma: &[u8], syndromes: &[u8], found: &[(usize, usize)]) -> Vec<u8> {
    let t = gf_tables();
    let nsym = syndromes.len();

    let mut omega = vec![0u8; nsym];
    for (i, &sc) in sigma.iter().enumerate().take(nsym) {
        for (j, &sy) in syndromes.iter().enumerate() {
            if i + j < nsym {
                omega[i + j] = gf_add(omega[i + j], gf_mul(sc, sy));
            }
        }
    }

    let deriv_len = sigma.len().saturating_sub(1);
    let mut sigma_prime = vec![0u8; deriv_len];
    for i in (1..sigma.len()).step_by(2) {
        sigma_prime[i - 1] = sigma[i];
    }

    let mut magnitudes = Vec::with_capacity(found.len());
    for &(gf_pos, _) in found {
        let x_val = if gf_pos == 0 { 1u8 } else { t.exp[gf_pos % 255] };
        let x_inv = if gf_pos == 0 {
            1u8
        } else {
            t.exp[(255 - (gf_pos % 255)) % 255]
        };

        let omega_val = eval_asc(&omega, x_inv);
        let sp_val = eval_asc(&sigma_prime, x_inv);

        if sp_val == 0 {
            // Degenerate locator; the post-correction syndrome check rejects it.
            magnitudes.push(0);
            continue;
        }

        magnitudes.push(gf_mul(x_val, gf_div(omega_val, sp_val)));
    }

    magnitudes
}

/// RS-decode a received codeword of `data_len + PARITY_LEN` bytes.
///
/// Returns the decode outcome; see [`RsDecoded`]. Clean codewords come back
/// with `errors = 0`; corrupted but correctable ones with the corrected data
/// and the located error count; everything else with `corrected = false` and
/// the raw data prefix.
///
/// # Panics
/// Panics if `received.len() <= PARITY_LEN`.
pub fn rs_decode(received: &[u8]) -> RsDecoded {
    assert!(
        received.len() > PARITY_LEN,
        "codeword shorter than parity length"
    );
    let data_len = received.len() - PARITY_LEN;
    let raw = || received[..data_len].to_vec();

    let syndromes = compute_syndromes(received);
    if syndromes.iter().all(|&s| s == 0) {
        return RsDecoded {
            data: raw(),
            corrected: true,
            errors: 0,
        };
    }

    let sigma = berlekamp_massey(&syndromes);
    let num_errors = sigma.len() - 1;

    let found = chien_search(&sigma, received.len());
    if found.is_empty() || found.len() > PARITY_LEN || found.len() != num_errors {
        return RsDecoded {
            data: raw(),
            corrected: false,
            errors: found.len(),
        };
    }

    let magnitudes = forney(&sigma, &syndromes, &found);

    let mut corrected = received.to_vec();
    for (i, &(_, array_pos)) in found.iter().enumerate() {
        corrected[array_pos] = gf_add(corrected[array_pos], magnitudes[i]);
    }

    // Reject miscorrections: the repaired word must be a valid codeword.
    if !compute_syndromes(&corrected).iter().all(|&s| s == 0) {
        return RsDecoded {
            data: raw(),
            corrected: false,
            errors: found.len(),
        };
    }

    RsDecoded {
        data: corrected[..data_len].to_vec(),
        corrected: true,
        errors: found.len(),
    }
}

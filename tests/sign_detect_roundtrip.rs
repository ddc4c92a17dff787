// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! End-to-end sign/detect integration tests through real WAV files.
//!
//! The tests run with `hop_size = 128` (one frame period ≈ 5.4 s at
//! 44.1 kHz) so multi-period scenarios stay small; the default hop only
//! changes the block size, not the code path.

use echomark_core::{detect, resign, sign, MarkError, PayloadRecord, SignatureKey, WatermarkOptions};
use echomark_core::wav::{self, WavBuffer};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;
use std::path::PathBuf;

const SAMPLE_RATE: u32 = 44_100;
const TEST_HOP: usize = 128; // samples_per_bit = 512

fn options(secret: &str) -> WatermarkOptions {
    let mut options = WatermarkOptions::new(secret);
    options.hop_size = TEST_HOP;
    options
}

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("echomark-e2e");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn write_stereo(name: &str, samples_per_channel: &[f32]) -> PathBuf {
    let mut interleaved = Vec::with_capacity(samples_per_channel.len() * 2);
    for &s in samples_per_channel {
        interleaved.push(s);
        interleaved.push(s);
    }
    let path = temp_path(name);
    wav::write(
        &path,
        &WavBuffer {
            sample_rate: SAMPLE_RATE,
            channels: 2,
            samples: interleaved,
        },
    )
    .unwrap();
    path
}

fn silence(seconds: f64) -> Vec<f32> {
    vec![0.0; (seconds * SAMPLE_RATE as f64) as usize]
}

fn gaussian_noise(frames: usize, sigma: f64, seed: u8) -> Vec<f32> {
    let mut rng = ChaCha20Rng::from_seed([seed; 32]);
    (0..frames)
        .map(|_| {
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen_range(0.0..1.0);
            let n = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
            (n * sigma) as f32
        })
        .collect()
}

/// In-memory stand-in for the caller's datastore.
fn store_with(records: HashMap<String, PayloadRecord>) -> impl Fn(&str) -> Option<PayloadRecord> {
    move |key: &str| records.get(key).cloned()
}

#[test]
fn silence_roundtrip() {
    let input = write_stereo("silence-in.wav", &silence(10.0));
    let output = temp_path("silence-signed.wav");
    let options = options("test-secret");

    let signed = sign(&input, &output, "album-x", "reviewer-1", &options).unwrap();
    assert_eq!(signed.payload.signature_key, signed.signature_id);
    assert_eq!(signed.payload.project_label, "album-x");
    assert_eq!(signed.payload.recipient_label, "reviewer-1");

    let mut records = HashMap::new();
    records.insert(signed.signature_id.clone(), signed.payload.clone());
    let store = store_with(records);

    let result = detect(&output, &options, &store).unwrap();
    assert!(result.detected);
    assert!(
        result.confidence >= 95,
        "confidence {} below 95",
        result.confidence
    );
    assert_eq!(result.stats.error_count, 0);
    assert_eq!(
        result.payload.as_ref().unwrap().signature_key,
        signed.signature_id
    );

    // The detect-side hash is over the recovered key bytes.
    let key = SignatureKey::parse(&signed.signature_id).unwrap();
    assert_eq!(result.payload_hash.as_deref(), Some(key.hash_hex().as_str()));
}

#[test]
fn noisy_carrier_roundtrip() {
    // 30 s of correlated stereo noise; the watermark rides well above it at
    // this strength, and five frame repetitions fold out the rest.
    let noise = gaussian_noise(30 * SAMPLE_RATE as usize, 0.05, 11);
    let input = write_stereo("noise-in.wav", &noise);
    let output = temp_path("noise-signed.wav");

    let mut options = options("test-secret");
    options.embed_strength = 0.5;

    let signed = sign(&input, &output, "album-x", "reviewer-2", &options).unwrap();
    let mut records = HashMap::new();
    records.insert(signed.signature_id.clone(), signed.payload.clone());
    let store = store_with(records);

    let result = detect(&output, &options, &store).unwrap();
    assert!(result.detected);
    assert!(
        result.stats.error_count <= 2,
        "error_count {} above 2",
        result.stats.error_count
    );
    assert!(
        result.confidence >= 80,
        "confidence {} below 80",
        result.confidence
    );
}

#[test]
fn default_strength_survives_folding() {
    // Quiet noise floor, contract-default gain. One repetition alone is
    // marginal here; nine folded periods recover the key cleanly.
    let period_frames = 464 * 4 * TEST_HOP;
    let noise = gaussian_noise(9 * period_frames + 1000, 0.005, 23);
    let input = write_stereo("fold-in.wav", &noise);
    let output = temp_path("fold-signed.wav");
    let options = options("test-secret");
    assert_eq!(options.embed_strength, 0.007);

    let signed = sign(&input, &output, "album-x", "reviewer-3", &options).unwrap();
    let mut records = HashMap::new();
    records.insert(signed.signature_id.clone(), signed.payload.clone());
    let store = store_with(records);

    let result = detect(&output, &options, &store).unwrap();
    assert!(result.detected, "fold detection failed: {result:?}");
    assert!(result.stats.error_count <= 2);
    assert!(result.confidence >= 60, "confidence {}", result.confidence);
    assert!(result.stats.blocks_analyzed >= 9 * 464);
}

#[test]
fn wrong_secret_rejected() {
    let input = write_stereo("wrongsecret-in.wav", &silence(10.0));
    let output = temp_path("wrongsecret-signed.wav");

    let signed = sign(&input, &output, "p", "r", &options("secret-a")).unwrap();
    let mut records = HashMap::new();
    records.insert(signed.signature_id.clone(), signed.payload.clone());
    let store = store_with(records);

    let result = detect(&output, &options("secret-b"), &store).unwrap();
    assert!(!result.detected);
    assert!(result.payload.is_none());
    assert!(result.payload_hash.is_none(), "no key should be recovered");
}

#[test]
fn short_input_detect_is_clean_negative() {
    // 5 s is less than one frame period at this hop size.
    let input = write_stereo("short-in.wav", &silence(5.0));
    let options = options("test-secret");

    let store = |_: &str| None;
    let result = detect(&input, &options, &store).unwrap();
    assert!(!result.detected);
    assert_eq!(result.confidence, 0);
    assert_eq!(result.stats.blocks_analyzed, 0);
}

#[test]
fn short_input_sign_fails() {
    let input = write_stereo("short-sign-in.wav", &silence(5.0));
    let output = temp_path("short-sign-out.wav");
    let err = sign(&input, &output, "p", "r", &options("test-secret"));
    assert!(matches!(err, Err(MarkError::ShortInput { .. })));
    assert!(!output.exists(), "no partial output on failure");
}

#[test]
fn lookup_miss_surfaces_key_hash() {
    let input = write_stereo("miss-in.wav", &silence(10.0));
    let output = temp_path("miss-signed.wav");
    let options = options("test-secret");

    let signed = sign(&input, &output, "p", "r", &options).unwrap();
    let store = |_: &str| None;

    let result = detect(&output, &options, &store).unwrap();
    assert!(!result.detected);
    assert!(result.payload.is_none());
    assert_eq!(result.stats.error_count, 0);

    let key = SignatureKey::parse(&signed.signature_id).unwrap();
    assert_eq!(result.payload_hash.as_deref(), Some(key.hash_hex().as_str()));
    // Key recovered cleanly, only the lookup term missing.
    assert_eq!(result.confidence, 90);
}

#[test]
fn resign_recovers_new_key_not_old() {
    let input = write_stereo("resign-in.wav", &silence(10.0));
    let first = temp_path("resign-first.wav");
    let second = temp_path("resign-second.wav");
    let options = options("test-secret");

    let old = sign(&input, &first, "p", "reviewer-old", &options).unwrap();
    let new = resign(
        &first,
        &second,
        "p",
        "reviewer-new",
        &old.signature_id,
        &options,
    )
    .unwrap();
    assert_ne!(old.signature_id, new.signature_id);

    let mut records = HashMap::new();
    records.insert(old.signature_id.clone(), old.payload.clone());
    records.insert(new.signature_id.clone(), new.payload.clone());
    let store = store_with(records);

    let result = detect(&second, &options, &store).unwrap();
    assert!(result.detected);
    let recovered = result.payload.unwrap();
    assert_eq!(recovered.signature_key, new.signature_id);
    assert_eq!(recovered.recipient_label, "reviewer-new");
}

#[test]
fn format_mismatch_is_fatal() {
    let input = write_stereo("format-in.wav", &silence(6.0));
    let mut options = options("test-secret");
    options.sample_rate = 48_000;

    let store = |_: &str| None;
    assert!(matches!(
        detect(&input, &options, &store),
        Err(MarkError::FormatMismatch { .. })
    ));
    let output = temp_path("format-out.wav");
    assert!(matches!(
        sign(&input, &output, "p", "r", &options),
        Err(MarkError::FormatMismatch { .. })
    ));
}

#[test]
fn mono_roundtrip() {
    let frames = silence(10.0);
    let path = temp_path("mono-in.wav");
    wav::write(
        &path,
        &WavBuffer {
            sample_rate: SAMPLE_RATE,
            channels: 1,
            samples: frames,
        },
    )
    .unwrap();

    let mut options = options("test-secret");
    options.channels = 1;
    let output = temp_path("mono-signed.wav");

    let signed = sign(&path, &output, "p", "r", &options).unwrap();
    // Output keeps the original channel count.
    let out_wav = wav::read(&output).unwrap();
    assert_eq!(out_wav.channels, 1);

    let mut records = HashMap::new();
    records.insert(signed.signature_id.clone(), signed.payload.clone());
    let store = store_with(records);

    let result = detect(&output, &options, &store).unwrap();
    assert!(result.detected);
    assert_eq!(result.stats.error_count, 0);
}

#[test]
fn unwatermarked_audio_is_negative() {
    let noise = gaussian_noise(10 * SAMPLE_RATE as usize, 0.1, 77);
    let input = write_stereo("plain-in.wav", &noise);
    let options = options("test-secret");

    let store = |_: &str| None;
    let result = detect(&input, &options, &store).unwrap();
    assert!(!result.detected);
    assert!(result.payload_hash.is_none());
}

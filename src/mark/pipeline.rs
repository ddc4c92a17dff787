// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Sign / detect pipelines.
//!
//! `sign` mints a key, frames it, and embeds the repeating frame into a WAV.
//! `detect` runs the recovery chain — correlate, fold, sync, deinterleave,
//! RS-decode — then asks the caller's store for the payload record.
//!
//! Only decode-layer failures become a `detected = false` result; anything
//! structural (I/O, format, configuration) propagates as an error.

use crate::mark::carrier::CarrierBank;
use crate::mark::config::WatermarkOptions;
use crate::mark::embed::embed;
use crate::mark::error::MarkError;
use crate::mark::extract::extract;
use crate::mark::frame::{build_frame, parse_frame, FRAME_BITS};
use crate::mark::payload::{
    iso8601_utc_now, payload_hash_hex, to_hex, PayloadRecord, SignatureKey,
};
use crate::mark::voting::{confidence_score, vote_frame_bits};
use crate::wav::{self, WavBuffer};
use std::path::{Path, PathBuf};

/// Band agreement is a legacy statistic from the FFT-domain extractor; the
/// time-domain extractor reports full agreement. Kept in the result shape
/// for interface stability.
const BAND_AGREEMENT: f64 = 1.0;

/// Result of a successful sign.
#[derive(Debug, Clone)]
pub struct SignResult {
    /// Where the signed WAV was written.
    pub output_path: PathBuf,
    /// Canonical signature key string; the caller persists the payload
    /// record under this primary key.
    pub signature_id: String,
    /// Hex SHA-256 of the JSON payload record.
    pub payload_hash: String,
    /// The record the caller should store.
    pub payload: PayloadRecord,
}

/// Per-detection statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectStats {
    /// Mean per-block correlation confidence in [0, 1].
    pub bit_confidence: f64,
    /// Legacy band agreement (1.0 for this codec).
    pub band_agreement: f64,
    /// Whole blocks correlated.
    pub blocks_analyzed: usize,
    /// RS byte errors corrected, or located when uncorrectable.
    pub error_count: usize,
}

/// Result of a detect call.
#[derive(Debug, Clone)]
pub struct DetectResult {
    /// True when a key was recovered *and* the store returned its record.
    pub detected: bool,
    /// Blended 0–100 confidence score.
    pub confidence: u8,
    /// The record from the caller's store, if any.
    pub payload: Option<PayloadRecord>,
    /// Hex SHA-256 of the recovered key bytes (present whenever a key was
    /// recovered, even on a store miss).
    pub payload_hash: Option<String>,
    /// Extraction and decode statistics.
    pub stats: DetectStats,
}

/// The caller-owned datastore: canonical key string in, payload record out.
pub trait PayloadStore {
    fn lookup(&self, signature_key: &str) -> Option<PayloadRecord>;
}

impl<F> PayloadStore for F
where
    F: Fn(&str) -> Option<PayloadRecord>,
{
    fn lookup(&self, signature_key: &str) -> Option<PayloadRecord> {
        self(signature_key)
    }
}

fn check_format(buffer: &WavBuffer, options: &WatermarkOptions) -> Result<(), MarkError> {
    if buffer.sample_rate != options.sample_rate || buffer.channels != options.channels {
        return Err(MarkError::FormatMismatch {
            expected_rate: options.sample_rate,
            expected_channels: options.channels,
            found_rate: buffer.sample_rate,
            found_channels: buffer.channels,
        });
    }
    Ok(())
}

fn split_channels(buffer: &WavBuffer) -> (Vec<f32>, Vec<f32>) {
    let left = buffer.channel(0);
    let right = if buffer.channels > 1 {
        buffer.channel(1)
    } else {
        // Mono: duplicate into a virtual second channel.
        left.clone()
    };
    (left, right)
}

fn sign_inner(
    input: &Path,
    output: &Path,
    project: &str,
    recipient: &str,
    options: &WatermarkOptions,
    key: SignatureKey,
    remove_key: Option<SignatureKey>,
) -> Result<SignResult, MarkError> {
    options.validate()?;

    let buffer = wav::read(input)?;
    check_format(&buffer, options)?;

    let spb = options.samples_per_bit();
    let needed = FRAME_BITS * spb;
    if buffer.frames() < needed {
        return Err(MarkError::ShortInput {
            frames: buffer.frames(),
            needed,
        });
    }

    let bank = CarrierBank::build(&options.secret, spb);
    let bits = build_frame(key.as_bytes());
    let remove_bits = remove_key.map(|k| build_frame(k.as_bytes()));

    let (mut left, mut right) = split_channels(&buffer);
    let blocks = embed(
        &mut left,
        &mut right,
        &bank,
        &bits,
        remove_bits.as_deref(),
        options.embed_strength,
    );

    let mut out = buffer;
    out.set_channel(0, &left);
    if out.channels > 1 {
        out.set_channel(1, &right);
    }
    wav::write(output, &out)?;
    log::info!("signed {blocks} blocks into {}", output.display());

    let payload = PayloadRecord {
        signature_key: key.to_canonical(),
        project_label: project.to_string(),
        recipient_label: recipient.to_string(),
        timestamp: iso8601_utc_now(),
    };

    Ok(SignResult {
        output_path: output.to_path_buf(),
        signature_id: key.to_canonical(),
        payload_hash: payload_hash_hex(&payload),
        payload,
    })
}

/// Sign a WAV: mint a fresh key, embed its frame, write the output.
///
/// The returned [`SignResult`] carries the payload record the caller must
/// persist under `signature_id` — the audio itself only ever holds the key.
pub fn sign(
    input: &Path,
    output: &Path,
    project: &str,
    recipient: &str,
    options: &WatermarkOptions,
) -> Result<SignResult, MarkError> {
    sign_inner(
        input,
        output,
        project,
        recipient,
        options,
        SignatureKey::mint(),
        None,
    )
}

/// Re-sign an already watermarked WAV for a new recipient.
///
/// Subtracts the prior key's watermark while adding the fresh one in a
/// single pass, so the old signature does not survive as interference.
/// `prior_key` is the canonical key string from the caller's store.
pub fn resign(
    input: &Path,
    output: &Path,
    project: &str,
    recipient: &str,
    prior_key: &str,
    options: &WatermarkOptions,
) -> Result<SignResult, MarkError> {
    let prior = SignatureKey::parse(prior_key)
        .ok_or_else(|| MarkError::InvalidConfig(format!("malformed prior key: {prior_key}")))?;
    sign_inner(
        input,
        output,
        project,
        recipient,
        options,
        SignatureKey::mint(),
        Some(prior),
    )
}

/// Detect a watermark and look its payload up in the caller's store.
///
/// Decode-layer failures (no sync, uncorrectable codeword, store miss, short
/// input) return `detected = false`; I/O, format and configuration problems
/// are errors.
pub fn detect(
    input: &Path,
    options: &WatermarkOptions,
    store: &dyn PayloadStore,
) -> Result<DetectResult, MarkError> {
    options.validate()?;

    let buffer = wav::read(input)?;
    check_format(&buffer, options)?;

    let spb = options.samples_per_bit();
    let needed = FRAME_BITS * spb;
    if buffer.frames() < needed {
        log::debug!(
            "short input: {} frames < {} for one frame period",
            buffer.frames(),
            needed
        );
        return Ok(DetectResult {
            detected: false,
            confidence: 0,
            payload: None,
            payload_hash: None,
            stats: DetectStats::default(),
        });
    }

    let bank = CarrierBank::build(&options.secret, spb);
    let (left, right) = split_channels(&buffer);
    let extraction = extract(&left, &right, &bank);
    let bits = vote_frame_bits(&extraction.correlations);

    let mut stats = DetectStats {
        bit_confidence: extraction.bit_confidence,
        band_agreement: BAND_AGREEMENT,
        blocks_analyzed: extraction.blocks_analyzed,
        error_count: 0,
    };

    match parse_frame(&bits) {
        Ok(frame) => {
            stats.error_count = frame.rs_errors;
            let key = SignatureKey::from_bytes(frame.key);
            let key_str = key.to_canonical();
            let payload = store.lookup(&key_str);
            let hit = payload.is_some();
            if !hit {
                log::debug!("key {key_str} recovered but not present in store");
            }
            let confidence = confidence_score(
                extraction.bit_confidence,
                BAND_AGREEMENT,
                frame.rs_errors,
                true,
                hit,
            );
            Ok(DetectResult {
                detected: hit,
                confidence,
                payload,
                payload_hash: Some(to_hex(&frame.key_hash)),
                stats,
            })
        }
        Err(
            MarkError::NoSync
            | MarkError::UnsupportedLength(_)
            | MarkError::WrongPayloadSize { .. },
        ) => {
            let confidence =
                confidence_score(extraction.bit_confidence, BAND_AGREEMENT, 32, false, false);
            Ok(DetectResult {
                detected: false,
                confidence,
                payload: None,
                payload_hash: None,
                stats,
            })
        }
        Err(MarkError::UncorrectableCodeword { errors }) => {
            stats.error_count = errors;
            let confidence =
                confidence_score(extraction.bit_confidence, BAND_AGREEMENT, 32, false, false);
            Ok(DetectResult {
                detected: false,
                confidence,
                payload: None,
                payload_hash: None,
                stats,
            })
        }
        Err(other) => Err(other),
    }
}

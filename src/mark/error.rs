// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Error types for the watermark layer.
//!
//! [`MarkError`] covers all failure modes from container parsing through
//! frame recovery. Only the decode-layer variants (`NoSync`,
//! `UncorrectableCodeword`, and `ShortInput` during detect) are converted to
//! a non-error `detected = false` result by the façade; everything else
//! propagates to the caller. A store miss is not an error at all — it shows
//! up as `detected = false` with the recovered key hash in the result.

use crate::wav::WavError;
use std::fmt;

/// Errors that can occur during watermark signing or detection.
#[derive(Debug)]
pub enum MarkError {
    /// The input or output WAV could not be read, written, or parsed.
    InvalidWav(WavError),
    /// The WAV header disagrees with the configured sample rate or channels.
    FormatMismatch {
        expected_rate: u32,
        expected_channels: u16,
        found_rate: u32,
        found_channels: u16,
    },
    /// Fewer samples than one full frame period of blocks.
    ShortInput { frames: usize, needed: usize },
    /// The sync preamble was not found in the recovered bit stream.
    NoSync,
    /// The frame length field holds something other than the fixed payload size.
    UnsupportedLength(u16),
    /// The bit stream is too short to hold the codeword the length field announces.
    WrongPayloadSize { have_bits: usize, need_bits: usize },
    /// Reed-Solomon reported more errors than it can correct.
    UncorrectableCodeword { errors: usize },
    /// Unknown option key, missing secret, or non-positive numeric parameter.
    InvalidConfig(String),
}

impl fmt::Display for MarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWav(e) => write!(f, "invalid WAV: {e}"),
            Self::FormatMismatch {
                expected_rate,
                expected_channels,
                found_rate,
                found_channels,
            } => write!(
                f,
                "WAV format mismatch: expected {expected_rate} Hz / {expected_channels} ch, \
                 found {found_rate} Hz / {found_channels} ch"
            ),
            Self::ShortInput { frames, needed } => write!(
                f,
                "input too short: {frames} sample frames, need at least {needed} for one frame period"
            ),
            Self::NoSync => write!(f, "sync preamble not found"),
            Self::UnsupportedLength(len) => write!(f, "unsupported payload length: {len}"),
            Self::WrongPayloadSize { have_bits, need_bits } => write!(
                f,
                "bit stream too short for codeword: have {have_bits}, need {need_bits}"
            ),
            Self::UncorrectableCodeword { errors } => {
                write!(f, "Reed-Solomon codeword uncorrectable ({errors} errors located)")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for MarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidWav(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WavError> for MarkError {
    fn from(e: WavError) -> Self {
        Self::InvalidWav(e)
    }
}

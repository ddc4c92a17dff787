// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! The watermark layer: framing, keyed carriers, embedding and recovery.
//!
//! Three subsystems carry the robustness story:
//!
//! - **Spread-spectrum PSK** (`carrier`, `embed`, `extract`): every frame bit
//!   is modulated onto a secret-and-position-keyed pseudo-noise waveform
//!   spanning thousands of samples.
//! - **Framing with ECC** (`frame`, `bits`, `ecc`): sync preamble, length
//!   field, and an interleaved RS(48,16) codeword — 464 bits per period,
//!   repeated until the audio runs out.
//! - **Soft recovery** (`voting`): correlations are folded across frame
//!   repetitions before any hard bit decision, then the tolerant sync search
//!   and the erasure-hardened RS decode do the rest.
//!
//! `fft` and `masking` are a spectral analysis side-layer; the codec itself
//! stays in the time domain.

pub mod bits;
pub mod carrier;
pub mod config;
pub mod ecc;
pub mod embed;
pub mod error;
pub mod extract;
pub mod fft;
pub mod frame;
pub mod masking;
pub mod payload;
pub mod pipeline;
pub mod voting;

pub use config::WatermarkOptions;
pub use error::MarkError;
pub use payload::{PayloadRecord, SignatureKey};
pub use pipeline::{detect, resign, sign, DetectResult, DetectStats, PayloadStore, SignResult};

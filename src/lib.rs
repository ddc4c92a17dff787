// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! # echomark-core
//!
//! Audio watermarking engine: embeds a 128-bit secret-keyed signature in a
//! stereo float-PCM signal so the carrier stays perceptually identical while
//! the signature survives lossy re-encoding, mild filtering, and resampling.
//!
//! The signature is an opaque key; all human-meaningful metadata (project,
//! recipient, timestamp) lives in a caller-owned datastore and is looked up
//! by that key after detection. The codec stack:
//!
//! - Spread-spectrum embedding over secret-keyed pseudo-noise carriers, one
//!   carrier per frame bit position (`mark::carrier`, `mark::embed`)
//! - Frame layer with sync preamble, length field, interleaving, and
//!   Reed-Solomon ECC over GF(2^8) (`mark::frame`, `mark::ecc`)
//! - Soft recovery: position-folded coherent voting, Hamming-tolerant sync
//!   search, erasure-hardened RS decode (`mark::voting`)
//!
//! The WAV container codec (`wav` module) is zero-dependency (std only).
//!
//! # Quick start
//!
//! ```rust,ignore
//! use echomark_core::{sign, detect, WatermarkOptions};
//!
//! let options = WatermarkOptions::new("studio-secret");
//! let result = sign("master.wav".as_ref(), "signed.wav".as_ref(),
//!                   "album-x", "reviewer-7", &options)?;
//! store.insert(result.signature_id.clone(), result.payload.clone());
//!
//! let hit = detect("leak.wav".as_ref(), &options, &|key: &str| store.get(key).cloned())?;
//! if hit.detected {
//!     println!("leaked copy belongs to {}", hit.payload.unwrap().recipient_label);
//! }
//! ```

pub mod mark;
pub mod wav;

pub use mark::config::WatermarkOptions;
pub use mark::error::MarkError;
pub use mark::payload::{PayloadRecord, SignatureKey};
pub use mark::pipeline::{detect, resign, sign, DetectResult, DetectStats, PayloadStore, SignResult};
pub use wav::{WavBuffer, WavError};

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Watermarking options.
//!
//! A plain struct with the documented defaults; `from_json` exists for
//! callers that pass an options bag across a process boundary and rejects
//! unknown keys so typos fail loudly instead of silently using a default.

use crate::mark::error::MarkError;
use serde::Deserialize;

/// Default expected sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default expected channel count.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Default base PN gain before energy adaptation.
pub const DEFAULT_EMBED_STRENGTH: f64 = 0.007;

/// Default hop size; one bit spans `4 * hop_size` samples.
pub const DEFAULT_HOP_SIZE: usize = 1024;

/// Options accepted by `sign` and `detect`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WatermarkOptions {
    /// Secret seeding the PN carriers. Required; changing it invalidates all
    /// prior watermarks.
    pub secret: String,
    /// Expected sample rate; a differing WAV header is a `FormatMismatch`.
    pub sample_rate: u32,
    /// Expected channel count (1 or 2).
    pub channels: u16,
    /// Base PN gain before energy adaptation.
    pub embed_strength: f64,
    /// Legacy hop parameter; `samples_per_bit = 4 * hop_size`.
    pub hop_size: usize,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            secret: String::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            embed_strength: DEFAULT_EMBED_STRENGTH,
            hop_size: DEFAULT_HOP_SIZE,
        }
    }
}

impl WatermarkOptions {
    /// Default options with the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Parse an options bag from JSON. Unknown keys and type mismatches are
    /// rejected, and the result is validated.
    pub fn from_json(json: &str) -> Result<Self, MarkError> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| MarkError::InvalidConfig(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reject a missing secret and non-positive numeric parameters.
    pub fn validate(&self) -> Result<(), MarkError> {
        if self.secret.is_empty() {
            return Err(MarkError::InvalidConfig("secret is required".into()));
        }
        if self.sample_rate == 0 {
            return Err(MarkError::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(MarkError::InvalidConfig("channels must be 1 or 2".into()));
        }
        if !(self.embed_strength > 0.0) {
            return Err(MarkError::InvalidConfig("embed_strength must be positive".into()));
        }
        if self.hop_size == 0 {
            return Err(MarkError::InvalidConfig("hop_size must be positive".into()));
        }
        Ok(())
    }

    /// Samples carrying one frame bit.
    pub fn samples_per_bit(&self) -> usize {
        self.hop_size * 4
    }
}

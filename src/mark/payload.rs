// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Signature keys and the externally stored payload record.
//!
//! The key is the only thing that ever touches the audio: 16 opaque bytes,
//! rendered in the canonical 8-4-4-4-12 form for the caller's datastore.
//! All human-meaningful metadata lives in the [`PayloadRecord`], which the
//! caller persists and the codec only ever hashes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// A 128-bit opaque signature key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureKey([u8; 16]);

impl SignatureKey {
    /// Mint a fresh random key (RFC 4122 version-4 layout).
    pub fn mint() -> Self {
        use rand::Rng;
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill(&mut bytes);
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Render the canonical lowercase 8-4-4-4-12 form.
    pub fn to_canonical(&self) -> String {
        let h = to_hex(&self.0);
        format!(
            "{}-{}-{}-{}-{}",
            &h[0..8],
            &h[8..12],
            &h[12..16],
            &h[16..20],
            &h[20..32]
        )
    }

    /// Parse the canonical 8-4-4-4-12 form (case-insensitive).
    pub fn parse(text: &str) -> Option<Self> {
        let groups: Vec<&str> = text.split('-').collect();
        if groups.len() != 5 {
            return None;
        }
        let widths = [8usize, 4, 4, 4, 12];
        for (g, w) in groups.iter().zip(widths) {
            if g.len() != w {
                return None;
            }
        }
        let hex: String = groups.concat();
        let mut bytes = [0u8; 16];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(s, 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// SHA-256 of the 16 key bytes, hex-encoded.
    pub fn hash_hex(&self) -> String {
        to_hex(&Sha256::digest(self.0))
    }
}

/// The externally stored payload record. Never embedded in the signal;
/// looked up by signature key after detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRecord {
    /// Canonical signature key string (primary key in the caller's store).
    pub signature_key: String,
    /// Project or asset label.
    pub project_label: String,
    /// Who the signed copy was handed to.
    pub recipient_label: String,
    /// ISO-8601 UTC timestamp of the signing.
    pub timestamp: String,
}

/// SHA-256 over the JSON serialization of a record, fields in declaration
/// order, hex-encoded.
pub fn payload_hash_hex(record: &PayloadRecord) -> String {
    let json = serde_json::to_string(record).expect("payload record serialization cannot fail");
    to_hex(&Sha256::digest(json.as_bytes()))
}

/// Lowercase hex encoding.
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Current time as an ISO-8601 UTC string with millisecond precision.
pub fn iso8601_utc_now() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    iso8601_from_epoch_millis(now.as_millis() as u64)
}

/// Format epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso8601_from_epoch_millis(epoch_millis: u64) -> String {
    let millis = epoch_millis % 1000;
    let secs = epoch_millis / 1000;
    let days = (secs / 86_400) as i64;
    let day_secs = secs % 86_400;

    let (year, month, day) = civil_from_days(days);
    let hour = day_secs / 3600;
    let minute = (day_secs / 60) % 60;
    let second = day_secs % 60;

    format!(
        "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{millis:03}Z"
    )
}

/// Days-since-epoch to civil date (proleptic Gregorian).
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    (y + i64::from(m <= 2), m, d)
}

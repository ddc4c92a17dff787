// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Pure-Rust RIFF/WAVE float-PCM container codec (zero external dependencies).
//!
//! Reads and writes 32-bit IEEE-float WAV files with 1 or 2 channels, the only
//! carrier format the watermark layer operates on. Parsing is deliberately
//! minimal: a `fmt ` chunk (extension bytes skipped) followed by a single
//! `data` chunk, with unknown chunks in between skipped over.
//!
//! Output files are written with a 16-byte fmt subchunk and one data chunk,
//! and are persisted atomically (temp file + rename) so a failed sign never
//! leaves a truncated WAV behind.

pub mod error;

pub use error::{Result, WavError};

use std::fs;
use std::io::Read;
use std::path::Path;

/// WAVE format tag for IEEE float samples.
const FORMAT_IEEE_FLOAT: u16 = 3;

/// An in-memory WAV buffer: interleaved 32-bit float samples.
#[derive(Debug, Clone)]
pub struct WavBuffer {
    /// Samples per second.
    pub sample_rate: u32,
    /// Channel count (1 or 2).
    pub channels: u16,
    /// Interleaved samples, `channels` values per frame.
    pub samples: Vec<f32>,
}

impl WavBuffer {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Extract one channel as a contiguous vector.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        let ch = self.channels as usize;
        self.samples
            .iter()
            .skip(index)
            .step_by(ch)
            .copied()
            .collect()
    }

    /// Write one channel back from a contiguous vector.
    ///
    /// # Panics
    /// Panics if `data.len()` does not match the frame count.
    pub fn set_channel(&mut self, index: usize, data: &[f32]) {
        let ch = self.channels as usize;
        assert_eq!(data.len(), self.frames(), "channel length mismatch");
        for (i, &v) in data.iter().enumerate() {
            self.samples[i * ch + index] = v;
        }
    }
}

fn read_exact_or_eof(input: &mut &[u8], buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|_| WavError::UnexpectedEof)
}

fn read_u16(input: &mut &[u8]) -> Result<u16> {
    let mut b = [0u8; 2];
    read_exact_or_eof(input, &mut b)?;
    Ok(u16::from_le_bytes(b))
}

fn read_u32(input: &mut &[u8]) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact_or_eof(input, &mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_id(input: &mut &[u8]) -> Result<[u8; 4]> {
    let mut b = [0u8; 4];
    read_exact_or_eof(input, &mut b)?;
    Ok(b)
}

fn skip(input: &mut &[u8], n: usize) -> Result<()> {
    if input.len() < n {
        return Err(WavError::UnexpectedEof);
    }
    *input = &input[n..];
    Ok(())
}

/// Parse a WAV byte stream into a [`WavBuffer`].
///
/// Requires a `fmt ` chunk describing IEEE-float 32-bit PCM, then a `data`
/// chunk. Unknown chunks (LIST, fact, cue, ...) are skipped. Extension bytes
/// in an oversized fmt chunk are skipped as well.
pub fn parse(bytes: &[u8]) -> Result<WavBuffer> {
    let mut input = bytes;

    let riff = read_id(&mut input)?;
    let _riff_size = read_u32(&mut input)?;
    let wave = read_id(&mut input)?;
    if &riff != b"RIFF" || &wave != b"WAVE" {
        return Err(WavError::NotRiff);
    }

    // Scan for fmt.
    let (audio_format, channels, sample_rate, bits_per_sample) = loop {
        let id = read_id(&mut input).map_err(|_| WavError::MissingChunk("fmt "))?;
        let size = read_u32(&mut input)? as usize;
        if &id == b"fmt " {
            if size < 16 {
                return Err(WavError::UnexpectedEof);
            }
            let audio_format = read_u16(&mut input)?;
            let channels = read_u16(&mut input)?;
            let sample_rate = read_u32(&mut input)?;
            let _byte_rate = read_u32(&mut input)?;
            let _block_align = read_u16(&mut input)?;
            let bits_per_sample = read_u16(&mut input)?;
            skip(&mut input, size - 16)?;
            break (audio_format, channels, sample_rate, bits_per_sample);
        }
        skip(&mut input, size)?;
    };

    if audio_format != FORMAT_IEEE_FLOAT || bits_per_sample != 32 {
        return Err(WavError::UnsupportedFormat {
            audio_format,
            bits_per_sample,
        });
    }

    // Scan for data, skipping intermediate chunks.
    let data = loop {
        let id = read_id(&mut input).map_err(|_| WavError::MissingChunk("data"))?;
        let size = read_u32(&mut input)? as usize;
        if &id == b"data" {
            if input.len() < size {
                return Err(WavError::UnexpectedEof);
            }
            break &input[..size];
        }
        skip(&mut input, size)?;
    };

    let mut samples = Vec::with_capacity(data.len() / 4);
    for chunk in data.chunks_exact(4) {
        samples.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(WavBuffer {
        sample_rate,
        channels,
        samples,
    })
}

/// Read a WAV file from disk.
pub fn read(path: &Path) -> Result<WavBuffer> {
    let bytes = fs::read(path)?;
    parse(&bytes)
}

/// Serialize a [`WavBuffer`] to bytes: RIFF header, 16-byte fmt, one data chunk.
pub fn serialize(wav: &WavBuffer) -> Vec<u8> {
    let data_size = (wav.samples.len() * 4) as u32;
    let fmt_size = 16u32;
    let riff_size = 4 + (8 + fmt_size) + (8 + data_size);
    let byte_rate = wav.sample_rate * wav.channels as u32 * 4;
    let block_align = wav.channels * 4;

    let mut out = Vec::with_capacity(riff_size as usize + 8);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&fmt_size.to_le_bytes());
    out.extend_from_slice(&FORMAT_IEEE_FLOAT.to_le_bytes());
    out.extend_from_slice(&wav.channels.to_le_bytes());
    out.extend_from_slice(&wav.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    for &s in &wav.samples {
        out.extend_from_slice(&s.to_le_bytes());
    }

    out
}

/// Write a WAV file to disk atomically.
///
/// The full byte stream is assembled in memory, written to a temporary file
/// in the destination directory, then renamed into place. A failure on any
/// step leaves either the old file or nothing — never a partial WAV.
pub fn write(path: &Path, wav: &WavBuffer) -> Result<()> {
    let bytes = serialize(wav);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp.push(".tmp");
    let tmp_path = dir.join(tmp);

    fs::write(&tmp_path, &bytes)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(WavError::Io(e));
    }
    Ok(())
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/echomark

//! Error types for WAV container parsing and writing.

use std::fmt;
use std::io;

/// Errors that can occur while reading or writing a RIFF/WAVE file.
#[derive(Debug)]
pub enum WavError {
    /// The underlying file could not be read or written.
    Io(io::Error),
    /// Missing RIFF/WAVE magic at the start of the file.
    NotRiff,
    /// The file ended in the middle of a chunk.
    UnexpectedEof,
    /// A required chunk (`fmt ` or `data`) was not found.
    MissingChunk(&'static str),
    /// The fmt chunk describes something other than IEEE-float 32-bit PCM.
    UnsupportedFormat { audio_format: u16, bits_per_sample: u16 },
}

impl fmt::Display for WavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "WAV I/O failure: {e}"),
            Self::NotRiff => write!(f, "missing RIFF/WAVE header (not a WAV file)"),
            Self::UnexpectedEof => write!(f, "unexpected end of WAV data"),
            Self::MissingChunk(id) => write!(f, "required chunk not found: {id:?}"),
            Self::UnsupportedFormat {
                audio_format,
                bits_per_sample,
            } => write!(
                f,
                "unsupported WAV format: audioFormat={audio_format}, bits={bits_per_sample} \
                 (only IEEE-float 32-bit is supported)"
            ),
        }
    }
}

impl std::error::Error for WavError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WavError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, WavError>;

//! # Audio Decoder Module
//!
//! Turns downloaded audio bytes into planar `f32` PCM.
//!
//! ## Overview
//!
//! [`AudioDecoder`] is the capability the sync engine depends on.
//! [`SymphoniaDecoder`] implements it with the pure-Rust Symphonia library,
//! which covers MP3, FLAC, Vorbis, Opus, AAC, ALAC and WAV.
//!
//! ```text
//! Bytes → MediaSourceStream → FormatReader → Decoder → SampleConverter → AudioBuffer
//! ```
//!
//! Whole files are decoded at once; the result is what gets cached.

mod format_detector;
mod sample_converter;
mod symphonia;

use async_trait::async_trait;
use bytes::Bytes;

use crate::buffer::AudioBuffer;
use crate::error::Result;

pub use self::symphonia::SymphoniaDecoder;
pub use format_detector::{AudioCodec, FormatDetector};
pub use sample_converter::SampleConverter;

/// Decoder capability: encoded bytes in, decoded buffer out.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode a complete audio file.
    ///
    /// `source_hint` is the URL or file name the bytes came from, used only
    /// to speed up format detection.
    async fn decode(&self, data: Bytes, source_hint: Option<&str>) -> Result<AudioBuffer>;
}

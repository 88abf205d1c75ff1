//! # Format Detection Module
//!
//! Probe hints and codec identification for downloaded audio.

use std::fmt;

use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Audio codec identified from a container track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCodec {
    Mp3,
    Aac,
    Flac,
    Vorbis,
    Opus,
    Alac,
    Wav,
    Unknown,
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Aac => "aac",
            AudioCodec::Flac => "flac",
            AudioCodec::Vorbis => "vorbis",
            AudioCodec::Opus => "opus",
            AudioCodec::Alac => "alac",
            AudioCodec::Wav => "pcm",
            AudioCodec::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Format detector for audio payloads.
pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint from a download URL or file name.
    ///
    /// The extension of the last path segment is used; query strings and
    /// fragments are ignored.
    ///
    /// ```rust
    /// use core_playback::FormatDetector;
    ///
    /// let hint = FormatDetector::hint_from_url("https://cdn.example.com/stems/drums.flac?token=abc");
    /// ```
    pub fn hint_from_url(url: &str) -> Hint {
        let mut hint = Hint::new();

        match Self::extension_of(url) {
            Some(extension) => {
                debug!("Setting probe hint extension: {}", extension);
                hint.with_extension(extension);
            }
            None => debug!("No file extension found, probe will auto-detect"),
        }

        hint
    }

    /// Create a probe hint from MIME type.
    pub fn hint_from_mime_type(mime_type: &str) -> Hint {
        let mut hint = Hint::new();
        hint.mime_type(mime_type);
        hint
    }

    fn extension_of(url: &str) -> Option<&str> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let segment = path.rsplit('/').next().unwrap_or(path);
        let (stem, extension) = segment.rsplit_once('.')?;
        if stem.is_empty() || extension.is_empty() || extension.len() > 5 {
            return None;
        }
        Some(extension)
    }

    /// Map a Symphonia codec type to [`AudioCodec`].
    pub fn detect_codec(codec_type: CodecType) -> AudioCodec {
        use symphonia::core::codecs::*;

        if codec_type == CODEC_TYPE_MP3 {
            AudioCodec::Mp3
        } else if codec_type == CODEC_TYPE_AAC {
            AudioCodec::Aac
        } else if codec_type == CODEC_TYPE_FLAC {
            AudioCodec::Flac
        } else if codec_type == CODEC_TYPE_VORBIS {
            AudioCodec::Vorbis
        } else if codec_type == CODEC_TYPE_OPUS {
            AudioCodec::Opus
        } else if codec_type == CODEC_TYPE_ALAC {
            AudioCodec::Alac
        } else if codec_type == CODEC_TYPE_PCM_S16LE
            || codec_type == CODEC_TYPE_PCM_S16BE
            || codec_type == CODEC_TYPE_PCM_S24LE
            || codec_type == CODEC_TYPE_PCM_S24BE
            || codec_type == CODEC_TYPE_PCM_S32LE
            || codec_type == CODEC_TYPE_PCM_S32BE
            || codec_type == CODEC_TYPE_PCM_F32LE
            || codec_type == CODEC_TYPE_PCM_F32BE
            || codec_type == CODEC_TYPE_PCM_F64LE
            || codec_type == CODEC_TYPE_PCM_F64BE
        {
            AudioCodec::Wav
        } else {
            warn!("Unknown codec type: {:?}", codec_type);
            AudioCodec::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CODEC_TYPE_FLAC, CODEC_TYPE_PCM_S16LE};

    #[test]
    fn test_extension_of_url() {
        assert_eq!(
            FormatDetector::extension_of("https://cdn/x/drums.mp3?alt=media&token=1"),
            Some("mp3")
        );
        assert_eq!(FormatDetector::extension_of("https://cdn/x/bass.flac#t=1"), Some("flac"));
        assert_eq!(FormatDetector::extension_of("https://cdn/x/stream"), None);
        assert_eq!(FormatDetector::extension_of("https://cdn/x/.hidden"), None);
    }

    #[test]
    fn test_detect_codec() {
        assert_eq!(FormatDetector::detect_codec(CODEC_TYPE_FLAC), AudioCodec::Flac);
        assert_eq!(FormatDetector::detect_codec(CODEC_TYPE_PCM_S16LE), AudioCodec::Wav);
        assert_eq!(AudioCodec::Wav.to_string(), "pcm");
    }
}

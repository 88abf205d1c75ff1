//! # Symphonia Decoder Implementation
//!
//! Decodes a complete in-memory audio file into planar `f32` PCM.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, error, instrument, warn};

use crate::buffer::AudioBuffer;
use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::decoder::AudioDecoder;
use crate::error::{PlaybackError, Result};

const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Decoder backed by Symphonia's probe, demuxer and codec registry.
///
/// Decoding is CPU bound and runs on the blocking thread pool.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode every packet of the first audio track in `data`.
    #[instrument(skip(data, hint), fields(bytes = data.len()))]
    pub fn decode_all(data: Bytes, hint: Hint) -> Result<AudioBuffer> {
        let media_source = Box::new(Cursor::new(data)) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(media_source, Default::default());

        let probe_result = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Format probe failed: {}", e);
                PlaybackError::InvalidFormat(format!("Failed to probe format: {}", e))
            })?;
        let mut format_reader = probe_result.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                PlaybackError::UnsupportedCodec("No supported audio tracks".to_string())
            })?;
        let track_id = track.id;
        let codec = FormatDetector::detect_codec(track.codec_params.codec);
        let mut sample_rate = track.codec_params.sample_rate;
        debug!(track_id, %codec, ?sample_rate, "Selected audio track");

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                PlaybackError::UnsupportedCodec(format!("Failed to create codec decoder: {}", e))
            })?;

        let mut planes: Vec<Vec<f32>> = Vec::new();
        let mut consecutive_errors = 0;

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    return Err(PlaybackError::DecodingError(
                        "Track list changed mid-stream".to_string(),
                    ));
                }
                Err(e) => {
                    return Err(PlaybackError::DecodingError(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    consecutive_errors = 0;
                    sample_rate.get_or_insert(decoded.spec().rate);
                    SampleConverter::append_planar(&decoded, &mut planes)?;
                }
                Err(err @ (SymphoniaError::DecodeError(_) | SymphoniaError::IoError(_)))
                    if consecutive_errors + 1 < MAX_CONSECUTIVE_ERRORS =>
                {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping corrupted packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                }
                Err(e) => {
                    error!("Fatal decode error: {}", e);
                    return Err(PlaybackError::CorruptedStream(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }

        if planes.is_empty() {
            let channels = track_channels(&*format_reader, track_id);
            if channels == 0 {
                return Err(PlaybackError::DecodingError(
                    "Stream contained no decodable audio".to_string(),
                ));
            }
            planes.resize_with(channels, Vec::new);
        }

        let sample_rate = sample_rate
            .ok_or_else(|| PlaybackError::InvalidFormat("Missing sample rate".to_string()))?;
        SampleConverter::count_clipped(&planes);

        let buffer = AudioBuffer::from_planes(sample_rate, planes)?;
        debug!(
            channels = buffer.number_of_channels(),
            frames = buffer.length(),
            sample_rate,
            "Decoded audio"
        );
        Ok(buffer)
    }
}

fn track_channels(reader: &dyn symphonia::core::formats::FormatReader, track_id: u32) -> usize {
    reader
        .tracks()
        .iter()
        .find(|t| t.id == track_id)
        .and_then(|t| t.codec_params.channels)
        .map(|c| c.count())
        .unwrap_or(0)
}

#[async_trait]
impl AudioDecoder for SymphoniaDecoder {
    async fn decode(&self, data: Bytes, source_hint: Option<&str>) -> Result<AudioBuffer> {
        let hint = source_hint
            .map(FormatDetector::hint_from_url)
            .unwrap_or_default();

        tokio::task::spawn_blocking(move || Self::decode_all(data, hint))
            .await
            .map_err(|e| PlaybackError::Internal(format!("Decode task failed: {}", e)))?
    }
}

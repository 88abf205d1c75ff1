//! # Sample Format Converter
//!
//! Normalizes decoded packets into planar `f32` channel planes.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;
use tracing::warn;

use crate::error::{PlaybackError, Result};

/// Sample converter that accumulates decoded audio as planar `f32`.
///
/// Symphonia outputs audio in various sample formats (i16, i24, i32, f32,
/// f64). Every packet is converted to `f32` in the range [-1.0, 1.0] and
/// appended to one plane per channel. `f32` input is copied unchanged.
pub struct SampleConverter;

impl SampleConverter {
    /// Append a decoded packet to `planes`.
    ///
    /// `planes` is sized from the first packet; later packets must carry the
    /// same channel count.
    pub fn append_planar(buffer: &AudioBufferRef<'_>, planes: &mut Vec<Vec<f32>>) -> Result<()> {
        let channels = buffer.spec().channels.count();
        if planes.is_empty() {
            planes.resize_with(channels, Vec::new);
        } else if planes.len() != channels {
            return Err(PlaybackError::CorruptedStream(format!(
                "channel count changed mid-stream from {} to {}",
                planes.len(),
                channels
            )));
        }

        match buffer {
            AudioBufferRef::F32(buf) => {
                for (index, plane) in planes.iter_mut().enumerate() {
                    plane.extend_from_slice(buf.chan(index));
                }
            }
            AudioBufferRef::F64(buf) => Self::convert_into(buf, planes),
            AudioBufferRef::S32(buf) => Self::convert_into(buf, planes),
            AudioBufferRef::S24(buf) => Self::convert_into(buf, planes),
            AudioBufferRef::S16(buf) => Self::convert_into(buf, planes),
            AudioBufferRef::S8(buf) => Self::convert_into(buf, planes),
            AudioBufferRef::U32(buf) => Self::convert_into(buf, planes),
            AudioBufferRef::U24(buf) => Self::convert_into(buf, planes),
            AudioBufferRef::U16(buf) => Self::convert_into(buf, planes),
            AudioBufferRef::U8(buf) => Self::convert_into(buf, planes),
        }

        Ok(())
    }

    fn convert_into<T>(buf: &AudioBuffer<T>, planes: &mut [Vec<f32>])
    where
        T: Sample + IntoSample<f32>,
    {
        for (index, plane) in planes.iter_mut().enumerate() {
            plane.extend(buf.chan(index).iter().map(|&sample| sample.into_sample()));
        }
    }

    /// Count samples outside [-1.0, 1.0], warning when any are found.
    pub fn count_clipped(planes: &[Vec<f32>]) -> usize {
        let total: usize = planes.iter().map(Vec::len).sum();
        let clipped = planes
            .iter()
            .flat_map(|plane| plane.iter())
            .filter(|s| **s < -1.0 || **s > 1.0)
            .count();

        if clipped > 0 {
            warn!(
                "Detected {} clipped samples ({:.2}% of total)",
                clipped,
                (clipped as f64 / total as f64) * 100.0
            );
        }

        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::audio::{Channels, SignalSpec};

    fn stereo_spec() -> SignalSpec {
        SignalSpec::new(44_100, Channels::FRONT_LEFT | Channels::FRONT_RIGHT)
    }

    #[test]
    fn test_append_s16_normalizes_to_planes() {
        let mut buf = AudioBuffer::<i16>::new(4, stereo_spec());
        buf.render_reserved(Some(4));
        buf.chan_mut(0).copy_from_slice(&[16_384, 0, -16_384, 0]);
        buf.chan_mut(1).copy_from_slice(&[0, 8_192, 0, -8_192]);

        let mut planes = Vec::new();
        SampleConverter::append_planar(&AudioBufferRef::S16(std::borrow::Cow::Borrowed(&buf)), &mut planes)
            .unwrap();
        SampleConverter::append_planar(&AudioBufferRef::S16(std::borrow::Cow::Borrowed(&buf)), &mut planes)
            .unwrap();

        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0].len(), 8);
        assert_eq!(planes[0][0], 0.5);
        assert_eq!(planes[0][2], -0.5);
        assert_eq!(planes[1][1], 0.25);
    }

    #[test]
    fn test_channel_change_is_rejected() {
        let mono = AudioBuffer::<f32>::new(4, SignalSpec::new(44_100, Channels::FRONT_LEFT));
        let mut planes = vec![Vec::new(), Vec::new()];
        let result =
            SampleConverter::append_planar(&AudioBufferRef::F32(std::borrow::Cow::Borrowed(&mono)), &mut planes);
        assert!(matches!(result, Err(PlaybackError::CorruptedStream(_))));
    }

    #[test]
    fn test_count_clipped() {
        let planes = vec![vec![0.0, 1.5], vec![-1.5, 0.5]];
        assert_eq!(SampleConverter::count_clipped(&planes), 2);
        assert_eq!(SampleConverter::count_clipped(&[vec![0.0, 1.0]]), 0);
    }
}

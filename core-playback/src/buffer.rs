//! Decoded PCM audio held in memory.

use std::time::Duration;

use core_library::ChannelSamples;

use crate::error::{PlaybackError, Result};

/// Planar `f32` audio at a fixed sample rate.
///
/// Mirrors the shape a mixing layer expects: per-channel sample access,
/// a frame length and a duration.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    samples: ChannelSamples,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, samples: ChannelSamples) -> Result<Self> {
        if sample_rate == 0 {
            return Err(PlaybackError::InvalidBuffer(
                "sample rate must be positive".to_string(),
            ));
        }
        Ok(Self {
            sample_rate,
            samples,
        })
    }

    /// Build from raw planes, validating that every plane has the same length.
    pub fn from_planes(sample_rate: u32, planes: Vec<Vec<f32>>) -> Result<Self> {
        let samples =
            ChannelSamples::new(planes).map_err(|e| PlaybackError::InvalidBuffer(e.to_string()))?;
        Self::new(sample_rate, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn number_of_channels(&self) -> usize {
        self.samples.channel_count()
    }

    /// Length in frames
    pub fn length(&self) -> usize {
        self.samples.frame_count()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.length() as f64 / self.sample_rate as f64)
    }

    pub fn get_channel_data(&self, channel: usize) -> Option<&[f32]> {
        self.samples.channel(channel)
    }

    pub fn samples(&self) -> &ChannelSamples {
        &self.samples
    }

    pub fn into_samples(self) -> ChannelSamples {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_shape() {
        let buffer = AudioBuffer::from_planes(8_000, vec![vec![0.1; 4_000], vec![0.2; 4_000]])
            .unwrap();
        assert_eq!(buffer.number_of_channels(), 2);
        assert_eq!(buffer.length(), 4_000);
        assert_eq!(buffer.duration(), Duration::from_millis(500));
        assert_eq!(buffer.get_channel_data(1).unwrap()[0], 0.2);
        assert!(buffer.get_channel_data(2).is_none());
    }

    #[test]
    fn test_buffer_rejects_bad_shape() {
        assert!(AudioBuffer::from_planes(0, vec![vec![0.0]]).is_err());
        assert!(AudioBuffer::from_planes(44_100, vec![]).is_err());
        assert!(AudioBuffer::from_planes(44_100, vec![vec![0.0; 2], vec![0.0]]).is_err());
    }
}

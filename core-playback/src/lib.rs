//! # Playback & Offline Cache Module
//!
//! Decoded-audio cache and cache-backed track loading for the stem player.
//!
//! ## Overview
//!
//! This module handles:
//! - Audio decoding using Symphonia ([`AudioDecoder`], [`SymphoniaDecoder`])
//! - The offline cache facade over the local store ([`cache::OfflineCache`])
//! - Loading a song's stems from the cache into the mixer ([`PlaybackLoader`])

pub mod buffer;
pub mod cache;
pub mod decoder;
pub mod error;
pub mod loader;

pub use buffer::AudioBuffer;
pub use cache::{CacheStats, OfflineCache};
pub use decoder::{AudioCodec, AudioDecoder, FormatDetector, SampleConverter, SymphoniaDecoder};
pub use error::{PlaybackError, Result};
pub use loader::{InMemoryTrack, LoadOutcome, MixerError, MixerGraph, NoopMixer, PlaybackLoader};

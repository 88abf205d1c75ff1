//! # Playback Loader
//!
//! Swaps the in-memory track set of the mixer for the tracks of one song,
//! read from the offline cache.
//!
//! ## Overview
//!
//! ```text
//! load_song_tracks_from_cache(song)
//!   1. tear down current sources through MixerGraph (errors logged, ignored)
//!   2. clear tracks, buffers and position
//!   3. for each track ref: "{songId}_{n}" → OfflineCache
//!        hit  → InMemoryTrack + buffer under id and name
//!        miss → warning, skipped
//! ```
//!
//! The mixing layer reads [`PlaybackLoader::current_tracks`] and
//! [`PlaybackLoader::buffer`]; it never touches the cache directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use core_library::{track_id_for, CachedSongMetadata};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::buffer::AudioBuffer;
use crate::cache::OfflineCache;
use crate::error::Result;

// =============================================================================
// Mixer Graph Capability
// =============================================================================

/// Failure reported by a mixer node operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    #[error("source already stopped")]
    AlreadyStopped,

    #[error("node already disconnected")]
    AlreadyDisconnected,

    #[error("mixer error: {0}")]
    Other(String),
}

/// Audio graph the loaded tracks are wired into.
///
/// Every call may fail for a node that is already stopped or disconnected;
/// the loader logs such failures and carries on.
pub trait MixerGraph: Send + Sync {
    fn stop_source(&self, track_id: &str) -> std::result::Result<(), MixerError>;

    fn disconnect_source(&self, track_id: &str) -> std::result::Result<(), MixerError>;

    fn disconnect_gain(&self, track_id: &str) -> std::result::Result<(), MixerError>;
}

/// Mixer for hosts without an audio graph
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMixer;

impl MixerGraph for NoopMixer {
    fn stop_source(&self, _track_id: &str) -> std::result::Result<(), MixerError> {
        Ok(())
    }

    fn disconnect_source(&self, _track_id: &str) -> std::result::Result<(), MixerError> {
        Ok(())
    }

    fn disconnect_gain(&self, _track_id: &str) -> std::result::Result<(), MixerError> {
        Ok(())
    }
}

// =============================================================================
// Loaded State
// =============================================================================

/// A track ready for mixing
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryTrack {
    pub id: String,
    pub name: String,
    pub buffer: Arc<AudioBuffer>,
    pub volume: f32,
    pub solo: bool,
    pub mute: bool,
    pub playing: bool,
}

impl InMemoryTrack {
    fn new(id: String, name: String, buffer: Arc<AudioBuffer>) -> Self {
        Self {
            id,
            name,
            buffer,
            volume: 1.0,
            solo: false,
            mute: false,
            playing: false,
        }
    }
}

/// Result of loading one song
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    pub song_id: String,
    pub loaded: usize,
    /// Track ids that were not in the cache
    pub missing: Vec<String>,
}

impl LoadOutcome {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    song_id: Option<String>,
    tracks: Vec<InMemoryTrack>,
    buffers: HashMap<String, Arc<AudioBuffer>>,
    position: Duration,
}

// =============================================================================
// Loader
// =============================================================================

pub struct PlaybackLoader {
    cache: OfflineCache,
    mixer: Arc<dyn MixerGraph>,
    state: RwLock<LoaderState>,
    load_lock: tokio::sync::Mutex<()>,
    event_bus: Option<EventBus>,
}

impl PlaybackLoader {
    pub fn new(cache: OfflineCache, mixer: Arc<dyn MixerGraph>) -> Self {
        Self {
            cache,
            mixer,
            state: RwLock::new(LoaderState::default()),
            load_lock: tokio::sync::Mutex::new(()),
            event_bus: None,
        }
    }

    /// Set event bus for playback events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Playback(event)).ok();
        }
    }

    /// Replace the current track set with `song`'s cached tracks.
    #[instrument(skip(self, song), fields(song_id = %song.song_id))]
    pub async fn load_song_tracks_from_cache(
        &self,
        song: &CachedSongMetadata,
    ) -> Result<LoadOutcome> {
        let _guard = self.load_lock.lock().await;

        self.teardown();

        let mut tracks = Vec::with_capacity(song.track_refs.len());
        let mut buffers = HashMap::with_capacity(song.track_refs.len() * 2);
        let mut missing = Vec::new();

        for (index, track_ref) in song.track_refs.iter().enumerate() {
            let track_id = track_id_for(&song.song_id, index);

            match self.cache.get_audio_asset(&track_id).await {
                Some(buffer) => {
                    let buffer = Arc::new(buffer);
                    buffers.insert(track_id.clone(), Arc::clone(&buffer));
                    buffers.insert(track_ref.name.clone(), Arc::clone(&buffer));
                    tracks.push(InMemoryTrack::new(track_id, track_ref.name.clone(), buffer));
                }
                None => {
                    warn!(track_id = %track_id, name = %track_ref.name, "Track not in offline cache");
                    self.emit(PlaybackEvent::TrackMissing {
                        song_id: song.song_id.clone(),
                        track_id: track_id.clone(),
                    });
                    missing.push(track_id);
                }
            }
        }

        let outcome = LoadOutcome {
            song_id: song.song_id.clone(),
            loaded: tracks.len(),
            missing,
        };

        {
            let mut state = self.state.write();
            state.song_id = Some(song.song_id.clone());
            state.tracks = tracks;
            state.buffers = buffers;
            state.position = Duration::ZERO;
        }

        info!(
            loaded = outcome.loaded,
            missing = outcome.missing.len(),
            "Song tracks loaded from cache"
        );
        self.emit(PlaybackEvent::TracksLoaded {
            song_id: outcome.song_id.clone(),
            loaded: outcome.loaded as u32,
            missing: outcome.missing.len() as u32,
        });

        Ok(outcome)
    }

    /// Stop and disconnect every current node, then drop the loaded state.
    fn teardown(&self) {
        let mut state = self.state.write();

        for track in &state.tracks {
            guarded(&track.id, "stop source", self.mixer.stop_source(&track.id));
            guarded(
                &track.id,
                "disconnect source",
                self.mixer.disconnect_source(&track.id),
            );
            guarded(
                &track.id,
                "disconnect gain",
                self.mixer.disconnect_gain(&track.id),
            );
        }

        *state = LoaderState::default();
    }

    /// Drop the current track set without loading another.
    pub fn unload(&self) {
        self.teardown();
    }

    pub fn current_tracks(&self) -> Vec<InMemoryTrack> {
        self.state.read().tracks.clone()
    }

    pub fn current_song_id(&self) -> Option<String> {
        self.state.read().song_id.clone()
    }

    /// Buffer registered under a track id or a track name
    pub fn buffer(&self, id_or_name: &str) -> Option<Arc<AudioBuffer>> {
        self.state.read().buffers.get(id_or_name).cloned()
    }

    pub fn position(&self) -> Duration {
        self.state.read().position
    }

    pub fn set_position(&self, position: Duration) {
        self.state.write().position = position;
    }
}

impl std::fmt::Debug for PlaybackLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("PlaybackLoader")
            .field("song_id", &state.song_id)
            .field("tracks", &state.tracks.len())
            .finish_non_exhaustive()
    }
}

fn guarded(track_id: &str, operation: &str, result: std::result::Result<(), MixerError>) {
    if let Err(e) = result {
        debug!(track_id, operation, error = %e, "Ignoring mixer teardown failure");
    }
}

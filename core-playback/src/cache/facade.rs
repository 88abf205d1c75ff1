//! # Offline Cache Facade
//!
//! Typed access to the local store for the sync engine and the player.
//!
//! Writes and reads never surface storage errors to callers: failures are
//! logged and reported as `false` or a miss. Only [`OfflineCache::clear_all`]
//! returns a `Result`, since a half-finished wipe must not go unnoticed.

use std::sync::Arc;

use bridge_traits::time::{Clock, SystemClock};
use core_library::{
    AppStateEntry, CachedAudioAsset, CachedSetlistMetadata, CachedSongMetadata, Collection,
    LocalStore,
};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::buffer::AudioBuffer;
use crate::cache::stats::CacheStats;
use crate::error::Result;

/// Collections wiped by [`OfflineCache::clear_all`]. `appState` survives.
pub const CONTENT_COLLECTIONS: [Collection; 3] =
    [Collection::AudioFiles, Collection::Songs, Collection::Setlists];

/// Facade over the offline cache collections.
#[derive(Clone)]
pub struct OfflineCache {
    store: LocalStore,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

impl OfflineCache {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            event_bus: None,
        }
    }

    /// Use `clock` for `cachedAt` / `updatedAt` stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set event bus for cache events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }

    // =========================================================================
    // Audio Assets
    // =========================================================================

    /// Store a decoded buffer under `track_id`. Returns `false` on any failure.
    #[instrument(skip(self, buffer), fields(frames = buffer.length()))]
    pub async fn save_audio_asset(
        &self,
        track_id: &str,
        song_id: &str,
        source_url: &str,
        buffer: AudioBuffer,
    ) -> bool {
        let sample_rate = buffer.sample_rate();
        let asset = match CachedAudioAsset::new(
            track_id,
            song_id,
            source_url,
            sample_rate,
            buffer.into_samples(),
            self.clock.now(),
        ) {
            Ok(asset) => asset,
            Err(e) => {
                warn!(error = %e, "Rejected audio asset");
                return false;
            }
        };

        let size_bytes = asset.approx_size_bytes();
        match self.store.put(&asset).await {
            Ok(()) => {
                debug!(size_bytes, "Audio asset cached");
                self.emit(CacheEvent::AssetCached {
                    track_id: track_id.to_string(),
                    song_id: song_id.to_string(),
                    size_bytes,
                });
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to cache audio asset");
                false
            }
        }
    }

    /// Decoded buffer for `track_id`, or `None` on a miss or read failure.
    pub async fn get_audio_asset(&self, track_id: &str) -> Option<AudioBuffer> {
        let asset = match self.store.get::<CachedAudioAsset>(track_id).await {
            Ok(Some(asset)) => asset,
            Ok(None) => return None,
            Err(e) => {
                warn!(track_id, error = %e, "Failed to read cached audio");
                return None;
            }
        };

        AudioBuffer::new(asset.sample_rate, asset.channels)
            .map_err(|e| warn!(track_id, error = %e, "Cached audio has invalid shape"))
            .ok()
    }

    pub async fn has_audio_asset(&self, track_id: &str) -> bool {
        self.store
            .exists(Collection::AudioFiles, track_id)
            .await
            .unwrap_or_else(|e| {
                warn!(track_id, error = %e, "Existence check failed");
                false
            })
    }

    /// Cached track ids of one song, in id order
    pub async fn audio_track_ids_for_song(&self, song_id: &str) -> Vec<String> {
        self.store
            .audio_track_ids_for_song(song_id)
            .await
            .unwrap_or_else(|e| {
                warn!(song_id, error = %e, "Failed to list cached tracks");
                Vec::new()
            })
    }

    // =========================================================================
    // Catalog Metadata
    // =========================================================================

    pub async fn save_song_metadata(&self, song: &CachedSongMetadata) -> bool {
        self.store
            .put(song)
            .await
            .map_err(|e| error!(song_id = %song.song_id, error = %e, "Failed to cache song"))
            .is_ok()
    }

    pub async fn get_song_metadata(&self, song_id: &str) -> Option<CachedSongMetadata> {
        self.store
            .get(song_id)
            .await
            .unwrap_or_else(|e| {
                warn!(song_id, error = %e, "Failed to read cached song");
                None
            })
    }

    pub async fn save_setlist_metadata(&self, setlist: &CachedSetlistMetadata) -> bool {
        self.store
            .put(setlist)
            .await
            .map_err(|e| {
                error!(setlist_id = %setlist.setlist_id, error = %e, "Failed to cache setlist")
            })
            .is_ok()
    }

    pub async fn get_setlist_metadata(&self, setlist_id: &str) -> Option<CachedSetlistMetadata> {
        self.store
            .get(setlist_id)
            .await
            .unwrap_or_else(|e| {
                warn!(setlist_id, error = %e, "Failed to read cached setlist");
                None
            })
    }

    /// Every cached song, in the order it was first cached
    pub async fn list_songs(&self) -> Result<Vec<CachedSongMetadata>> {
        Ok(self.store.get_all().await?)
    }

    /// Every cached setlist, in the order it was first cached
    pub async fn list_setlists(&self) -> Result<Vec<CachedSetlistMetadata>> {
        Ok(self.store.get_all().await?)
    }

    // =========================================================================
    // App State
    // =========================================================================

    pub async fn save_app_state<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                error!(key, error = %e, "App state is not serializable");
                return false;
            }
        };

        let entry = AppStateEntry {
            key: key.to_string(),
            value,
            updated_at: self.clock.now(),
        };
        self.store
            .put(&entry)
            .await
            .map_err(|e| error!(key, error = %e, "Failed to save app state"))
            .is_ok()
    }

    /// Typed app-state value. A missing key, read failure or shape mismatch
    /// all yield `None`.
    pub async fn get_app_state<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = match self.store.get::<AppStateEntry>(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(key, error = %e, "Failed to read app state");
                return None;
            }
        };

        serde_json::from_value(entry.value)
            .map_err(|e| warn!(key, error = %e, "App state has unexpected shape"))
            .ok()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Counts and total size, or `None` when the store cannot be read.
    pub async fn get_stats(&self) -> Option<CacheStats> {
        self.compute_stats()
            .await
            .map_err(|e| warn!(error = %e, "Failed to compute cache stats"))
            .ok()
    }

    async fn compute_stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            audio_files: self.store.count(Collection::AudioFiles).await?,
            songs: self.store.count(Collection::Songs).await?,
            setlists: self.store.count(Collection::Setlists).await?,
            total_size: self.store.total_audio_size().await?,
        })
    }

    /// Wipe audio, songs and setlists in one transaction.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<()> {
        self.store.clear(&CONTENT_COLLECTIONS).await?;
        info!("Offline cache cleared");

        self.emit(CacheEvent::Cleared {
            collections: CONTENT_COLLECTIONS
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        });
        Ok(())
    }
}

impl std::fmt::Debug for OfflineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCache")
            .field("store", &self.store)
            .field("event_bus", &self.event_bus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::time::FixedClock;
    use chrono::{DateTime, Utc};
    use core_library::{create_test_store, format_timestamp, AppStateEntry};
    use serde::Deserialize;
    use serde_json::{json, Map};

    fn instant() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn cache() -> OfflineCache {
        OfflineCache::new(create_test_store().await).with_clock(Arc::new(FixedClock(instant())))
    }

    fn buffer(frames: usize) -> AudioBuffer {
        let left: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.37).sin()).collect();
        let right: Vec<f32> = left.iter().map(|s| -s / 3.0).collect();
        AudioBuffer::from_planes(44_100, vec![left, right]).unwrap()
    }

    fn song(id: &str) -> CachedSongMetadata {
        CachedSongMetadata {
            song_id: id.to_string(),
            name: format!("Song {}", id),
            artist: Some("Band".to_string()),
            bpm: Some(128),
            key: Some("Am".to_string()),
            track_refs: vec![],
            extra: Map::new(),
            cached_at: instant(),
        }
    }

    #[tokio::test]
    async fn test_audio_asset_roundtrip_is_sample_exact() {
        let cache = cache().await;
        let original = buffer(1_024);

        assert!(
            cache
                .save_audio_asset("s1_1", "s1", "https://cdn/s1/1.mp3", original.clone())
                .await
        );
        let restored = cache.get_audio_asset("s1_1").await.unwrap();

        assert_eq!(restored.sample_rate(), original.sample_rate());
        assert_eq!(restored.number_of_channels(), 2);
        assert_eq!(restored.length(), 1_024);
        for channel in 0..2 {
            let a = original.get_channel_data(channel).unwrap();
            let b = restored.get_channel_data(channel).unwrap();
            assert!(a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits()));
        }
    }

    #[tokio::test]
    async fn test_roundtrip_across_channel_and_frame_counts() {
        let cache = cache().await;
        let nan_payload = f32::from_bits(0x7fc0_1234);
        let cases: [(usize, usize, u32); 6] = [
            (1, 0, 8_000),
            (1, 1, 11_025),
            (3, 1, 22_050),
            (2, 4_097, 44_100),
            (6, 777, 48_000),
            (8, 10_000, 96_000),
        ];

        for (index, (channels, frames, sample_rate)) in cases.into_iter().enumerate() {
            let planes: Vec<Vec<f32>> = (0..channels)
                .map(|c| {
                    (0..frames)
                        .map(|i| match (i + c) % 5 {
                            0 => nan_payload,
                            1 => -0.0,
                            2 => f32::MIN_POSITIVE / 4.0,
                            _ => (i as f32 * 0.013 + c as f32).sin(),
                        })
                        .collect()
                })
                .collect();
            let track_id = format!("rt_{}", index + 1);
            let url = format!("https://cdn/rt/{}.wav", index);
            let original = AudioBuffer::from_planes(sample_rate, planes.clone()).unwrap();

            assert!(cache.save_audio_asset(&track_id, "rt", &url, original).await);
            let restored = cache.get_audio_asset(&track_id).await.unwrap();

            assert_eq!(restored.sample_rate(), sample_rate);
            assert_eq!(restored.number_of_channels(), channels);
            assert_eq!(restored.length(), frames);
            for (c, plane) in planes.iter().enumerate() {
                let restored_bits: Vec<u32> = restored
                    .get_channel_data(c)
                    .unwrap()
                    .iter()
                    .map(|s| s.to_bits())
                    .collect();
                let original_bits: Vec<u32> = plane.iter().map(|s| s.to_bits()).collect();
                assert_eq!(restored_bits, original_bits, "case {} channel {}", index, c);
            }
        }

        let stats = cache.get_stats().await.unwrap();
        assert_eq!(stats.audio_files, 6);
        assert_eq!(
            stats.total_size,
            (1 + 3 + 2 * 4_097 + 6 * 777 + 8 * 10_000) as u64 * 4
        );
    }

    #[tokio::test]
    async fn test_audio_miss_and_existence() {
        let cache = cache().await;
        assert!(cache.get_audio_asset("missing").await.is_none());
        assert!(!cache.has_audio_asset("missing").await);

        cache.save_audio_asset("s1_2", "s1", "u", buffer(4)).await;
        assert!(cache.has_audio_asset("s1_2").await);
        assert_eq!(cache.audio_track_ids_for_song("s1").await, vec!["s1_2"]);
    }

    #[tokio::test]
    async fn test_save_audio_returns_false_on_conflict() {
        let cache = cache().await;
        assert!(cache.save_audio_asset("s1_1", "s1", "shared", buffer(4)).await);
        assert!(!cache.save_audio_asset("s2_1", "s2", "shared", buffer(4)).await);
    }

    #[tokio::test]
    async fn test_save_audio_emits_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let cache = cache().await.with_event_bus(bus);

        cache.save_audio_asset("s1_1", "s1", "u", buffer(10)).await;

        match rx.try_recv().unwrap() {
            CoreEvent::Cache(CacheEvent::AssetCached { size_bytes, .. }) => {
                assert_eq!(size_bytes, 10 * 2 * 4)
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_metadata_roundtrip() {
        let cache = cache().await;
        assert!(cache.save_song_metadata(&song("s1")).await);
        assert_eq!(cache.get_song_metadata("s1").await.unwrap().bpm, Some(128));
        assert!(cache.get_setlist_metadata("none").await.is_none());

        let setlist = CachedSetlistMetadata {
            setlist_id: "set1".to_string(),
            name: "Friday".to_string(),
            song_ids: vec!["s2".to_string(), "s1".to_string()],
            extra: Map::new(),
            cached_at: instant(),
        };
        assert!(cache.save_setlist_metadata(&setlist).await);
        assert_eq!(cache.list_setlists().await.unwrap(), vec![setlist]);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Volume {
        level: f64,
    }

    #[tokio::test]
    async fn test_typed_app_state() {
        let cache = cache().await;
        assert!(cache.save_app_state("volume", &Volume { level: 0.8 }).await);
        assert_eq!(
            cache.get_app_state::<Volume>("volume").await,
            Some(Volume { level: 0.8 })
        );

        // Wrong shape is a miss.
        assert!(cache.get_app_state::<Vec<String>>("volume").await.is_none());
        assert!(cache.get_app_state::<Volume>("absent").await.is_none());

        let raw: AppStateEntry = cache.store().get("volume").await.unwrap().unwrap();
        assert_eq!(raw.value, json!({ "level": 0.8 }));
        assert_eq!(format_timestamp(&raw.updated_at), "2024-05-01T08:30:00.000Z");
    }

    #[tokio::test]
    async fn test_stats_and_clear_all_keep_app_state() {
        let cache = cache().await;
        cache.save_song_metadata(&song("s1")).await;
        cache.save_audio_asset("s1_1", "s1", "u1", buffer(100)).await;
        cache.save_audio_asset("s1_2", "s1", "u2", buffer(50)).await;
        cache.save_app_state("lastAppState", &json!({ "lastSongId": "s1" })).await;

        let stats = cache.get_stats().await.unwrap();
        assert_eq!(
            stats,
            CacheStats {
                audio_files: 2,
                songs: 1,
                setlists: 0,
                total_size: 150 * 2 * 4,
            }
        );

        cache.clear_all().await.unwrap();

        assert!(cache.get_stats().await.unwrap().is_empty());
        assert!(cache
            .get_app_state::<serde_json::Value>("lastAppState")
            .await
            .is_some());
    }
}

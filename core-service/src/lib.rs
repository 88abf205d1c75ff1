//! Core service façade and bootstrap helpers.
//!
//! [`CoreService`] is the single context object a host holds. It owns the
//! offline cache, the sync orchestrator, the playback loader and the event
//! bus, all wired from one [`CoreConfig`]. Desktop apps typically enable the
//! `desktop-shims` feature, which supplies the reqwest HTTP client, the
//! desktop network monitor and the Firestore catalog.
//!
//! ```rust,ignore
//! let core = CoreService::bootstrap(config, CoreDependencies::default()).await?;
//! match core.initialize().await {
//!     StartupDecision::SyncRequired => { core.sync(Some(progress)).await?; }
//!     StartupDecision::Resumed(outcome) => println!("{:?}", outcome),
//!     StartupDecision::OnlineOnly => println!("offline cache unavailable"),
//! }
//! ```

pub mod capabilities;
pub mod error;
pub mod startup;

pub use capabilities::{DefaultSelection, NetworkSongLoader, NoDefaultSelection, NoNetworkSongLoader};
pub use error::{CoreError, Result};
pub use startup::{ResumeOutcome, StartupDecision};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use core_library::{open_cache_store, CachedSetlistMetadata, CachedSongMetadata};
use core_playback::{
    AudioDecoder, CacheStats, LoadOutcome, MixerGraph, NoopMixer, OfflineCache, PlaybackLoader,
    SymphoniaDecoder,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{
    ConnectivityEvent, CoreEvent, EventBus, EventStream, PlaybackEvent,
};
use core_sync::{
    AppStateTracker, ProgressCallback, SyncConfig, SyncOrchestrator, SyncOutcome, SyncStatus,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

#[cfg(feature = "desktop-shims")]
pub use provider_firestore::{FirestoreCatalog, FirestoreConfig};

/// Host capabilities that are not part of [`CoreConfig`].
pub struct CoreDependencies {
    pub decoder: Arc<dyn AudioDecoder>,
    pub mixer: Arc<dyn MixerGraph>,
    pub network_loader: Arc<dyn NetworkSongLoader>,
    pub default_selection: Arc<dyn DefaultSelection>,
}

impl CoreDependencies {
    pub fn with_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_mixer(mut self, mixer: Arc<dyn MixerGraph>) -> Self {
        self.mixer = mixer;
        self
    }

    pub fn with_network_loader(mut self, loader: Arc<dyn NetworkSongLoader>) -> Self {
        self.network_loader = loader;
        self
    }

    pub fn with_default_selection(mut self, selection: Arc<dyn DefaultSelection>) -> Self {
        self.default_selection = selection;
        self
    }
}

impl Default for CoreDependencies {
    /// Symphonia decoding with no-op mixer, network loader and default selection.
    fn default() -> Self {
        Self {
            decoder: Arc::new(SymphoniaDecoder::new()),
            mixer: Arc::new(NoopMixer),
            network_loader: Arc::new(NoNetworkSongLoader),
            default_selection: Arc::new(NoDefaultSelection),
        }
    }
}

struct Inner {
    config: CoreConfig,
    deps: CoreDependencies,
    event_bus: EventBus,
    cache: OfflineCache,
    sync: SyncOrchestrator,
    loader: PlaybackLoader,
    online: Arc<AtomicBool>,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<Inner>,
}

impl CoreService {
    /// Validate `config`, open the cache database and wire every component.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Config`] when the configuration is invalid
    /// - [`CoreError::Library`] when the cache database cannot be opened;
    ///   the host should continue online only
    pub async fn bootstrap(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let store =
            open_cache_store(&config.database_path, config.database_max_connections).await?;
        Ok(Self::with_cache(config, deps, OfflineCache::new(store)))
    }

    /// Wire every component around an already opened cache.
    pub fn with_cache(config: CoreConfig, deps: CoreDependencies, cache: OfflineCache) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        let cache = cache
            .with_clock(config.clock.clone())
            .with_event_bus(event_bus.clone());

        let sync = SyncOrchestrator::new(
            cache.clone(),
            config.http_client.clone(),
            deps.decoder.clone(),
            SyncConfig::from(&config),
        )
        .with_clock(config.clock.clone())
        .with_event_bus(event_bus.clone());

        let loader =
            PlaybackLoader::new(cache.clone(), deps.mixer.clone()).with_event_bus(event_bus.clone());

        Self {
            inner: Arc::new(Inner {
                config,
                deps,
                event_bus,
                cache,
                sync,
                loader,
                online: Arc::new(AtomicBool::new(true)),
            }),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &OfflineCache {
        &self.inner.cache
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.inner.sync
    }

    pub fn loader(&self) -> &PlaybackLoader {
        &self.inner.loader
    }

    pub fn app_state(&self) -> &AppStateTracker {
        self.inner.sync.app_state()
    }

    /// Subscribe to every core event.
    pub fn events(&self) -> EventStream {
        self.inner.event_bus.stream()
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Offline-first startup: load the sync status, then either ask for a
    /// sync or resume the last session.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> StartupDecision {
        info!("Initializing offline-first startup");

        if let Err(e) = self.inner.sync.init().await {
            warn!(error = %e, "Offline cache unavailable, continuing online only");
            return StartupDecision::OnlineOnly;
        }

        if !self.inner.sync.is_initial_sync_complete() {
            info!("Initial sync not complete");
            return StartupDecision::SyncRequired;
        }

        if let Some(stats) = self.get_stats().await {
            info!(
                setlists = stats.setlists,
                songs = stats.songs,
                audio_files = stats.audio_files,
                total_size_mb = format!("{:.2}", stats.total_size_mb()),
                "Offline cache ready"
            );
        }

        StartupDecision::Resumed(self.auto_load_last_state().await)
    }

    /// Restore the last session. Never fails; problems are logged and
    /// reported as [`ResumeOutcome::Failed`].
    #[instrument(skip(self))]
    pub async fn auto_load_last_state(&self) -> ResumeOutcome {
        let Some(last) = self.app_state().get_last_app_state().await else {
            info!("No previous state found");
            return match self.inner.deps.default_selection.select_default().await {
                Ok(()) => ResumeOutcome::Default,
                Err(e) => {
                    error!(error = %e, "Default selection failed");
                    ResumeOutcome::Failed(e.to_string())
                }
            };
        };

        debug!(
            setlist_id = ?last.last_setlist_id,
            song_id = %last.last_song_id,
            "Found last state"
        );

        let Some(song) = self.inner.cache.get_song_metadata(&last.last_song_id).await else {
            info!(song_id = %last.last_song_id, "Last song not cached, loading from network");
            return match self
                .inner
                .deps
                .network_loader
                .load_song(&last.last_song_id)
                .await
            {
                Ok(()) => ResumeOutcome::Network {
                    song_id: last.last_song_id,
                },
                Err(e) => {
                    error!(error = %e, "Network song load failed");
                    ResumeOutcome::Failed(e.to_string())
                }
            };
        };

        match self.inner.loader.load_song_tracks_from_cache(&song).await {
            Ok(outcome) => {
                self.inner
                    .event_bus
                    .emit(CoreEvent::Playback(PlaybackEvent::StateResumed {
                        setlist_id: last.last_setlist_id,
                        song_id: last.last_song_id,
                    }))
                    .ok();
                ResumeOutcome::Cached(outcome)
            }
            Err(e) => {
                error!(error = %e, "Failed to load last song from cache");
                ResumeOutcome::Failed(e.to_string())
            }
        }
    }

    /// Remember the current selection for the next launch.
    pub async fn save_current_state(&self, setlist_id: Option<&str>, song_id: &str) -> bool {
        self.app_state().save_last_app_state(setlist_id, song_id).await
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Populate the cache from the configured remote catalog.
    pub async fn sync(&self, on_progress: Option<ProgressCallback>) -> Result<SyncOutcome> {
        let catalog = self.inner.config.remote_catalog.clone();
        Ok(self
            .inner
            .sync
            .perform_initial_sync(catalog.as_ref(), on_progress)
            .await?)
    }

    /// Wipe cached content and sync again.
    pub async fn force_resync(&self, on_progress: Option<ProgressCallback>) -> Result<SyncOutcome> {
        let catalog = self.inner.config.remote_catalog.clone();
        Ok(self
            .inner
            .sync
            .force_resync(catalog.as_ref(), on_progress)
            .await?)
    }

    pub fn is_initial_sync_complete(&self) -> bool {
        self.inner.sync.is_initial_sync_complete()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.inner.sync.status()
    }

    // =========================================================================
    // Cache Queries
    // =========================================================================

    pub async fn get_stats(&self) -> Option<CacheStats> {
        self.inner.cache.get_stats().await
    }

    /// All cached setlists; empty when the cache cannot be read.
    pub async fn get_setlists_from_cache(&self) -> Vec<CachedSetlistMetadata> {
        self.inner.cache.list_setlists().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to list cached setlists");
            Vec::new()
        })
    }

    /// All cached songs; empty when the cache cannot be read.
    pub async fn get_songs_from_cache(&self) -> Vec<CachedSongMetadata> {
        self.inner.cache.list_songs().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to list cached songs");
            Vec::new()
        })
    }

    /// Load a cached song's tracks into the player.
    ///
    /// # Errors
    ///
    /// [`CoreError::SongNotCached`] when the song metadata is not cached.
    pub async fn load_song(&self, song_id: &str) -> Result<LoadOutcome> {
        let song = self
            .inner
            .cache
            .get_song_metadata(song_id)
            .await
            .ok_or_else(|| CoreError::SongNotCached(song_id.to_string()))?;
        Ok(self.inner.loader.load_song_tracks_from_cache(&song).await?)
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Current connectivity. Online when no network monitor is configured.
    pub async fn is_online(&self) -> bool {
        let online = match &self.inner.config.network_monitor {
            Some(monitor) => monitor.is_connected().await,
            None => true,
        };
        self.inner.online.store(online, Ordering::SeqCst);
        online
    }

    /// Follow connectivity changes and publish them as events.
    ///
    /// Returns `None` when no network monitor is configured.
    pub async fn watch_connectivity(&self) -> Result<Option<JoinHandle<()>>> {
        let Some(monitor) = self.inner.config.network_monitor.clone() else {
            debug!("No network monitor configured");
            return Ok(None);
        };

        let mut changes = monitor.subscribe_changes().await?;
        let event_bus = self.inner.event_bus.clone();
        let online = self.inner.online.clone();

        Ok(Some(tokio::spawn(async move {
            while let Some(info) = changes.next().await {
                let now_online = info.is_online();
                if online.swap(now_online, Ordering::SeqCst) == now_online {
                    continue;
                }

                let event = if now_online {
                    info!("Network connection restored");
                    ConnectivityEvent::Online
                } else {
                    warn!("Network connection lost");
                    ConnectivityEvent::Offline
                };
                event_bus.emit(CoreEvent::Connectivity(event)).ok();
            }
            debug!("Connectivity stream closed");
        })))
    }
}

/// Desktop bootstrap: reqwest HTTP, the desktop network monitor and the
/// Firestore catalog. Without a `database_path` the cache lives under the
/// platform data directory.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example() -> core_service::Result<()> {
/// use core_service::{bootstrap_desktop, FirestoreConfig};
///
/// let core = bootstrap_desktop(None, FirestoreConfig::new("my-project")).await?;
/// let decision = core.initialize().await;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    database_path: Option<std::path::PathBuf>,
    firestore: FirestoreConfig,
) -> Result<CoreService> {
    use bridge_traits::http::HttpClient;

    let database_path = match database_path {
        Some(path) => path,
        None => bridge_desktop::default_database_path()?,
    };

    let http: Arc<dyn HttpClient> = Arc::new(bridge_desktop::ReqwestHttpClient::new()?);
    let catalog = Arc::new(FirestoreCatalog::new(firestore, http.clone()));

    let config = CoreConfig::builder()
        .database_path(database_path)
        .http_client(http)
        .remote_catalog(catalog)
        .build()?;

    CoreService::bootstrap(config, CoreDependencies::default()).await
}

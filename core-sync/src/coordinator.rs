//! # Sync Orchestrator
//!
//! Mirrors the remote catalog and every referenced audio stem into the
//! offline cache.
//!
//! ## Workflow
//!
//! 1. List `setlists`, persist each document (progress 25)
//! 2. List `songs`, persist each document (progress 50)
//! 3. For every track of every song, skip it when already cached, otherwise
//!    download, decode and store it (progress 50..95)
//! 4. Persist the sync status (progress 100)
//!
//! Per-track failures land in the [`SyncReport`] and never abort the run.
//! A failure to list either collection aborts it and leaves the
//! orchestrator in `SyncPending`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncOrchestrator};
//!
//! let orchestrator = SyncOrchestrator::new(cache, http, decoder, SyncConfig::default());
//! if let Some(last) = orchestrator.init().await? {
//!     println!("Resume {}", last.last_song_id);
//! }
//! if !orchestrator.is_initial_sync_complete() {
//!     let outcome = orchestrator.perform_initial_sync(catalog.as_ref(), None).await?;
//!     println!("{} tracks cached", outcome.report.succeeded);
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge_traits::catalog::{RemoteCatalog, SETLISTS_COLLECTION, SONGS_COLLECTION};
use bridge_traits::http::HttpClient;
use bridge_traits::time::{Clock, SystemClock};
use core_library::{CachedSongMetadata, SYNC_STATUS_KEY};
use core_playback::{AudioDecoder, OfflineCache};
use core_runtime::config::{
    CoreConfig, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_DOWNLOADS,
};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use futures::stream::{self, StreamExt};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::app_state::{AppStateTracker, LastAppState};
use crate::catalog::{parse_setlist, parse_song};
use crate::progress::{ProgressCallback, ProgressReporter, SETLISTS_DONE, SONGS_DONE};
use crate::report::{SyncOutcome, SyncReport};
use crate::status::{SyncState, SyncStatus};
use crate::{Result, SyncError};

/// Sync orchestrator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Audio downloads in flight at once
    pub max_concurrent_downloads: usize,

    /// Timeout for a single audio download
    pub download_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

impl From<&CoreConfig> for SyncConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            max_concurrent_downloads: config.max_concurrent_downloads,
            download_timeout: config.download_timeout(),
        }
    }
}

/// One track to bring into the cache
#[derive(Debug, Clone)]
struct TrackJob {
    track_id: String,
    song_id: String,
    source_url: Option<String>,
}

enum TrackResult {
    Cached,
    AlreadyCached,
}

pub struct SyncOrchestrator {
    cache: OfflineCache,
    http: Arc<dyn HttpClient>,
    decoder: Arc<dyn AudioDecoder>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    event_bus: Option<EventBus>,
    state: Mutex<SyncState>,
    status: RwLock<SyncStatus>,
    app_state: AppStateTracker,
}

impl SyncOrchestrator {
    pub fn new(
        cache: OfflineCache,
        http: Arc<dyn HttpClient>,
        decoder: Arc<dyn AudioDecoder>,
        config: SyncConfig,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            app_state: AppStateTracker::new(cache.clone(), clock.clone()),
            cache,
            http,
            decoder,
            clock,
            config,
            event_bus: None,
            state: Mutex::new(SyncState::Uninitialized),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    /// Use `clock` for sync dates and app-state stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.app_state = AppStateTracker::new(self.cache.clone(), clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    /// Snapshot of the in-memory sync status
    pub fn status(&self) -> SyncStatus {
        self.status.read().clone()
    }

    /// In-memory flag; does not touch the store.
    pub fn is_initial_sync_complete(&self) -> bool {
        self.status.read().is_initial_sync_complete
    }

    pub fn app_state(&self) -> &AppStateTracker {
        &self.app_state
    }

    pub fn cache(&self) -> &OfflineCache {
        &self.cache
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Sync(event)).ok();
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Load the persisted sync status and return the last session, if any.
    ///
    /// Calling it again re-reads what is persisted.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Store`] when the store cannot be read
    /// - [`SyncError::SyncInProgress`] while a run is in flight
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<Option<LastAppState>> {
        self.state.lock().transition(SyncState::Initializing)?;

        let status = match self.load_status().await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "Failed to initialize offline cache");
                *self.state.lock() = SyncState::Uninitialized;
                return Err(e);
            }
        };

        let resting = status.resting_state();
        info!(
            complete = status.is_initial_sync_complete,
            songs = status.total_songs,
            audio_files = status.total_audio_files,
            "Offline cache initialized"
        );
        *self.status.write() = status;
        self.state.lock().transition(resting)?;

        Ok(self.app_state.get_last_app_state().await)
    }

    async fn load_status(&self) -> Result<SyncStatus> {
        let version = self.cache.store().schema_version().await?;
        debug!(schema_version = version, "Store is reachable");

        match self.cache.get_app_state::<SyncStatus>(SYNC_STATUS_KEY).await {
            Some(status) => Ok(status),
            None => {
                let status = SyncStatus::default();
                self.persist_status(&status).await;
                Ok(status)
            }
        }
    }

    async fn persist_status(&self, status: &SyncStatus) {
        if !self.cache.save_app_state(SYNC_STATUS_KEY, status).await {
            warn!("Sync status was not persisted");
        }
    }

    // =========================================================================
    // Sync Runs
    // =========================================================================

    /// Populate the cache from `catalog`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidStateTransition`] before [`init`](Self::init)
    /// - [`SyncError::SyncInProgress`] when another run is in flight
    /// - [`SyncError::MetadataFetch`] when a collection cannot be listed
    pub async fn perform_initial_sync(
        &self,
        catalog: &dyn RemoteCatalog,
        on_progress: Option<ProgressCallback>,
    ) -> Result<SyncOutcome> {
        self.enter_syncing(false)?;
        self.run(catalog, on_progress, false).await
    }

    /// Wipe cached content, reset the sync status, then sync again.
    pub async fn force_resync(
        &self,
        catalog: &dyn RemoteCatalog,
        on_progress: Option<ProgressCallback>,
    ) -> Result<SyncOutcome> {
        self.enter_syncing(true)?;
        self.run(catalog, on_progress, true).await
    }

    fn enter_syncing(&self, forced: bool) -> Result<()> {
        let mut state = self.state.lock();
        if forced && *state == SyncState::SyncComplete {
            state.transition(SyncState::SyncPending)?;
        }
        state.transition(SyncState::Syncing)
    }

    #[instrument(skip(self, catalog, on_progress), fields(run_id = tracing::field::Empty))]
    async fn run(
        &self,
        catalog: &dyn RemoteCatalog,
        on_progress: Option<ProgressCallback>,
        forced: bool,
    ) -> Result<SyncOutcome> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        let started = Instant::now();

        info!(forced, "Starting offline sync");
        self.emit(SyncEvent::Started {
            run_id: run_id.clone(),
            forced,
        });

        let progress = ProgressReporter::new(&run_id, on_progress, self.event_bus.clone());

        match self.execute_run(catalog, &progress, &run_id, forced).await {
            Ok((stats, report)) => {
                self.state.lock().transition(SyncState::SyncComplete)?;
                let duration = started.elapsed();

                info!(
                    attempted = report.attempted,
                    succeeded = report.succeeded,
                    skipped = report.skipped_cached,
                    failed = report.failed_count(),
                    duration_ms = duration.as_millis() as u64,
                    "Offline sync complete"
                );
                self.emit(SyncEvent::Completed {
                    run_id,
                    attempted: report.attempted,
                    succeeded: report.succeeded,
                    failed: report.failed_count(),
                    duration_secs: duration.as_secs(),
                });

                Ok(SyncOutcome {
                    success: true,
                    duration_seconds: duration.as_secs_f64(),
                    stats,
                    report,
                })
            }
            Err(e) => {
                if let Err(transition) = self.state.lock().transition(SyncState::SyncPending) {
                    warn!(error = %transition, "Could not reset sync state");
                }

                error!(error = %e, "Offline sync failed");
                self.emit(SyncEvent::Failed {
                    run_id,
                    message: e.to_string(),
                    recoverable: e.is_recoverable(),
                });
                Err(e)
            }
        }
    }

    async fn execute_run(
        &self,
        catalog: &dyn RemoteCatalog,
        progress: &ProgressReporter,
        run_id: &str,
        forced: bool,
    ) -> Result<(SyncStatus, SyncReport)> {
        if forced {
            info!("Clearing cached content before resync");
            self.cache.clear_all().await?;
            let reset = SyncStatus::default();
            self.persist_status(&reset).await;
            *self.status.write() = reset;
        }

        // Phase 1: setlists
        info!("Phase 1: Caching setlists");
        let total_setlists = self.cache_setlists(catalog).await?;
        progress.report(SETLISTS_DONE, "Setlists cached");

        // Phase 2: song metadata
        info!("Phase 2: Caching song metadata");
        let songs = self.cache_songs(catalog).await?;
        progress.report(SONGS_DONE, "Songs metadata cached");

        // Phase 3: audio
        let jobs = track_jobs(&songs);
        info!("Phase 3: Caching {} audio tracks", jobs.len());
        progress.set_total_tracks(jobs.len());
        let total_tracks = jobs.len() as u64;
        let report = self.download_tracks(jobs, progress, run_id).await;

        // Phase 4: status
        info!("Phase 4: Recording sync status");
        let status = SyncStatus {
            is_initial_sync_complete: true,
            last_sync_date: Some(self.clock.now()),
            total_songs: songs.len() as u64,
            total_audio_files: total_tracks,
            total_setlists,
            sync_progress: 100,
        };
        self.persist_status(&status).await;
        *self.status.write() = status.clone();
        progress.report(100, "Sync complete!");

        Ok((status, report))
    }

    async fn cache_setlists(&self, catalog: &dyn RemoteCatalog) -> Result<u64> {
        let documents = catalog
            .list_documents(SETLISTS_COLLECTION)
            .await
            .map_err(|e| SyncError::MetadataFetch {
                collection: SETLISTS_COLLECTION.to_string(),
                message: e.to_string(),
            })?;

        let cached_at = self.clock.now();
        let mut parsed = 0;
        for doc in &documents {
            match parse_setlist(doc, cached_at) {
                Ok(setlist) => {
                    parsed += 1;
                    if !self.cache.save_setlist_metadata(&setlist).await {
                        warn!(setlist_id = %setlist.setlist_id, "Setlist not cached");
                    }
                }
                Err(e) => warn!(error = %e, "Skipping setlist document"),
            }
        }

        debug!(listed = documents.len(), parsed, "Setlists processed");
        Ok(parsed)
    }

    async fn cache_songs(&self, catalog: &dyn RemoteCatalog) -> Result<Vec<CachedSongMetadata>> {
        let documents = catalog
            .list_documents(SONGS_COLLECTION)
            .await
            .map_err(|e| SyncError::MetadataFetch {
                collection: SONGS_COLLECTION.to_string(),
                message: e.to_string(),
            })?;

        let cached_at = self.clock.now();
        let mut songs = Vec::with_capacity(documents.len());
        for doc in &documents {
            match parse_song(doc, cached_at) {
                Ok(song) => {
                    if !self.cache.save_song_metadata(&song).await {
                        warn!(song_id = %song.song_id, "Song metadata not cached");
                    }
                    songs.push(song);
                }
                Err(e) => warn!(error = %e, "Skipping song document"),
            }
        }

        debug!(listed = documents.len(), parsed = songs.len(), "Songs processed");
        Ok(songs)
    }

    async fn download_tracks(
        &self,
        jobs: Vec<TrackJob>,
        progress: &ProgressReporter,
        run_id: &str,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let mut results = stream::iter(jobs)
            .map(|job| self.process_track(job))
            .buffer_unordered(self.config.max_concurrent_downloads.max(1));

        while let Some((track_id, result)) = results.next().await {
            match result {
                Ok(TrackResult::Cached) => report.record_success(),
                Ok(TrackResult::AlreadyCached) => report.record_skipped(),
                Err(e) => {
                    warn!(track_id = %track_id, error = %e, "Track not cached");
                    self.emit(SyncEvent::TrackFailed {
                        run_id: run_id.to_string(),
                        track_id: track_id.clone(),
                        reason: e.to_string(),
                    });
                    report.record_failure(track_id, e.to_string());
                }
            }
            progress.track_completed();
        }

        report
    }

    async fn process_track(&self, job: TrackJob) -> (String, Result<TrackResult>) {
        let result = self.cache_track(&job).await;
        (job.track_id, result)
    }

    async fn cache_track(&self, job: &TrackJob) -> Result<TrackResult> {
        if self.cache.has_audio_asset(&job.track_id).await {
            debug!(track_id = %job.track_id, "Already cached");
            return Ok(TrackResult::AlreadyCached);
        }

        let url = job
            .source_url
            .as_deref()
            .ok_or_else(|| SyncError::AssetFetch {
                track_id: job.track_id.clone(),
                message: "no download URL".to_string(),
            })?;

        let bytes = self
            .http
            .get_bytes(url, Some(self.config.download_timeout))
            .await
            .map_err(|e| SyncError::AssetFetch {
                track_id: job.track_id.clone(),
                message: e.to_string(),
            })?;

        let buffer = self
            .decoder
            .decode(bytes, Some(url))
            .await
            .map_err(|e| SyncError::Decode {
                track_id: job.track_id.clone(),
                message: e.to_string(),
            })?;

        if !self
            .cache
            .save_audio_asset(&job.track_id, &job.song_id, url, buffer)
            .await
        {
            return Err(SyncError::AssetWrite {
                track_id: job.track_id.clone(),
            });
        }

        debug!(track_id = %job.track_id, "Track cached");
        Ok(TrackResult::Cached)
    }
}

/// Tracks in catalog order, ids derived as `{songId}_{index+1}`
fn track_jobs(songs: &[CachedSongMetadata]) -> Vec<TrackJob> {
    songs
        .iter()
        .flat_map(|song| {
            song.track_refs
                .iter()
                .enumerate()
                .map(move |(index, track)| TrackJob {
                    track_id: song.track_id(index),
                    song_id: song.song_id.clone(),
                    source_url: track.source_url.clone(),
                })
        })
        .collect()
}

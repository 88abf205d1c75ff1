//! Startup, resume and connectivity flows of the core service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogDocument, RemoteCatalog, SETLISTS_COLLECTION, SONGS_COLLECTION};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::network::{NetworkChangeStream, NetworkInfo, NetworkMonitor};
use bytes::Bytes;
use core_library::create_test_store;
use core_playback::OfflineCache;
use core_runtime::config::CoreConfig;
use core_runtime::events::{ConnectivityEvent, CoreEvent};
use core_service::{
    CoreDependencies, CoreError, CoreService, DefaultSelection, NetworkSongLoader, ResumeOutcome,
    StartupDecision,
};
use mockall::mock;
use serde_json::json;
use tokio::sync::mpsc;

// ============================================================================
// Fakes
// ============================================================================

mock! {
    Http {}

    #[async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

struct StaticCatalog {
    collections: HashMap<String, Vec<CatalogDocument>>,
}

impl StaticCatalog {
    fn new() -> Self {
        let mut collections = HashMap::new();
        collections.insert(
            SETLISTS_COLLECTION.to_string(),
            vec![CatalogDocument::new(
                "set-1",
                json!({ "name": "Sunday", "songs": ["song-1"] }),
            )],
        );
        collections.insert(
            SONGS_COLLECTION.to_string(),
            vec![CatalogDocument::new(
                "song-1",
                json!({
                    "name": "Opener",
                    "tracks": [
                        { "name": "Click", "downloadUrl": "https://cdn/song-1/click.wav" },
                        { "name": "Bass", "downloadUrl": "https://cdn/song-1/bass.wav" }
                    ]
                }),
            )],
        );
        Self { collections }
    }
}

#[async_trait]
impl RemoteCatalog for StaticCatalog {
    async fn list_documents(&self, collection: &str) -> BridgeResult<Vec<CatalogDocument>> {
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }

    async fn get_document(&self, collection: &str, id: &str) -> BridgeResult<Option<CatalogDocument>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }
}

#[derive(Default)]
struct RecordingLoader {
    requested: Mutex<Vec<String>>,
}

#[async_trait]
impl NetworkSongLoader for RecordingLoader {
    async fn load_song(&self, song_id: &str) -> BridgeResult<()> {
        self.requested.lock().unwrap().push(song_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSelection {
    calls: Mutex<u32>,
    fail: bool,
}

#[async_trait]
impl DefaultSelection for RecordingSelection {
    async fn select_default(&self) -> BridgeResult<()> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(BridgeError::OperationFailed("no setlists".to_string()));
        }
        Ok(())
    }
}

struct FakeMonitor {
    online: AtomicBool,
    changes: Mutex<Option<mpsc::UnboundedReceiver<NetworkInfo>>>,
}

struct ChannelStream(mpsc::UnboundedReceiver<NetworkInfo>);

#[async_trait]
impl NetworkChangeStream for ChannelStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        self.0.recv().await
    }
}

#[async_trait]
impl NetworkMonitor for FakeMonitor {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(if self.online.load(Ordering::SeqCst) {
            NetworkInfo::connected(None)
        } else {
            NetworkInfo::disconnected()
        })
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        let rx = self
            .changes
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BridgeError::NotAvailable("already subscribed".to_string()))?;
        Ok(Box::new(ChannelStream(rx)))
    }
}

fn wav_bytes(frames: usize) -> Bytes {
    let data_len = (frames * 2) as u32;
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8_000u32.to_le_bytes());
    out.extend_from_slice(&16_000u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for i in 0..frames {
        out.extend_from_slice(&(i as i16).to_le_bytes());
    }
    Bytes::from(out)
}

fn serving_http() -> Arc<MockHttp> {
    let mut http = MockHttp::new();
    http.expect_execute().returning(|_| {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: wav_bytes(400),
        })
    });
    Arc::new(http)
}

fn config(monitor: Option<Arc<dyn NetworkMonitor>>) -> CoreConfig {
    let mut config = CoreConfig::builder()
        .database_path("/unused/offline-cache.db")
        .http_client(serving_http())
        .remote_catalog(Arc::new(StaticCatalog::new()))
        .build()
        .unwrap();
    config.network_monitor = monitor;
    config
}

fn service_with(cache: &OfflineCache, deps: CoreDependencies) -> CoreService {
    CoreService::with_cache(config(None), deps, cache.clone())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_fresh_cache_requires_sync() {
    let cache = OfflineCache::new(create_test_store().await);
    let core = service_with(&cache, CoreDependencies::default());

    assert_eq!(core.initialize().await, StartupDecision::SyncRequired);
    assert!(!core.is_initial_sync_complete());
}

#[tokio::test]
async fn test_resume_loads_last_song_from_cache() {
    let cache = OfflineCache::new(create_test_store().await);

    let first = service_with(&cache, CoreDependencies::default());
    assert_eq!(first.initialize().await, StartupDecision::SyncRequired);
    let outcome = first.sync(None).await.unwrap();
    assert_eq!(outcome.report.succeeded, 2);
    assert!(first.save_current_state(Some("set-1"), "song-1").await);

    let second = service_with(&cache, CoreDependencies::default());
    let mut events = second
        .events()
        .filter(|e| matches!(e, CoreEvent::Playback(_)));

    match second.initialize().await {
        StartupDecision::Resumed(ResumeOutcome::Cached(loaded)) => {
            assert_eq!(loaded.song_id, "song-1");
            assert_eq!(loaded.loaded, 2);
            assert!(loaded.is_complete());
        }
        other => panic!("unexpected decision {:?}", other),
    }
    assert_eq!(second.loader().current_tracks().len(), 2);
    assert!(second.loader().buffer("Bass").is_some());

    let mut saw_resume = false;
    while let Some(Ok(event)) = events.try_recv() {
        if let CoreEvent::Playback(core_runtime::events::PlaybackEvent::StateResumed {
            setlist_id,
            song_id,
        }) = event
        {
            assert_eq!(setlist_id.as_deref(), Some("set-1"));
            assert_eq!(song_id, "song-1");
            saw_resume = true;
        }
    }
    assert!(saw_resume);
}

#[tokio::test]
async fn test_no_previous_state_uses_default_selection() {
    let cache = OfflineCache::new(create_test_store().await);
    let selection = Arc::new(RecordingSelection::default());
    let core = service_with(
        &cache,
        CoreDependencies::default().with_default_selection(selection.clone()),
    );
    core.initialize().await;
    core.sync(None).await.unwrap();

    assert_eq!(core.auto_load_last_state().await, ResumeOutcome::Default);
    assert_eq!(*selection.calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_default_selection_failure_is_reported() {
    let cache = OfflineCache::new(create_test_store().await);
    let selection = Arc::new(RecordingSelection {
        fail: true,
        ..RecordingSelection::default()
    });
    let core = service_with(
        &cache,
        CoreDependencies::default().with_default_selection(selection),
    );

    let outcome = core.auto_load_last_state().await;
    assert!(outcome.is_failed());
}

#[tokio::test]
async fn test_uncached_song_goes_to_network_loader() {
    let cache = OfflineCache::new(create_test_store().await);
    let loader = Arc::new(RecordingLoader::default());
    let core = service_with(
        &cache,
        CoreDependencies::default().with_network_loader(loader.clone()),
    );
    core.initialize().await;
    assert!(core.save_current_state(None, "song-404").await);

    let outcome = core.auto_load_last_state().await;

    assert_eq!(
        outcome,
        ResumeOutcome::Network {
            song_id: "song-404".to_string()
        }
    );
    assert_eq!(*loader.requested.lock().unwrap(), vec!["song-404".to_string()]);
}

#[tokio::test]
async fn test_unavailable_store_means_online_only() {
    let cache = OfflineCache::new(create_test_store().await);
    cache.store().close().await.unwrap();
    let core = service_with(&cache, CoreDependencies::default());

    assert_eq!(core.initialize().await, StartupDecision::OnlineOnly);
    assert!(core.get_setlists_from_cache().await.is_empty());
}

#[tokio::test]
async fn test_cache_listings_and_load_song() {
    let cache = OfflineCache::new(create_test_store().await);
    let core = service_with(&cache, CoreDependencies::default());
    core.initialize().await;
    core.sync(None).await.unwrap();

    let setlists = core.get_setlists_from_cache().await;
    assert_eq!(setlists.len(), 1);
    assert_eq!(setlists[0].song_ids, vec!["song-1".to_string()]);
    assert_eq!(core.get_songs_from_cache().await.len(), 1);

    let stats = core.get_stats().await.unwrap();
    assert_eq!(stats.audio_files, 2);
    assert_eq!(stats.total_size, 2 * 400 * 4);

    let loaded = core.load_song("song-1").await.unwrap();
    assert_eq!(loaded.loaded, 2);
    assert!(matches!(
        core.load_song("missing").await,
        Err(CoreError::SongNotCached(id)) if id == "missing"
    ));
}

#[tokio::test]
async fn test_force_resync_through_service() {
    let cache = OfflineCache::new(create_test_store().await);
    let core = service_with(&cache, CoreDependencies::default());
    core.initialize().await;
    core.sync(None).await.unwrap();

    let outcome = core.force_resync(None).await.unwrap();

    assert_eq!(outcome.report.succeeded, 2);
    assert!(core.sync_status().is_initial_sync_complete);
}

#[tokio::test]
async fn test_connectivity_changes_are_published() {
    let (tx, rx) = mpsc::unbounded_channel();
    let monitor = Arc::new(FakeMonitor {
        online: AtomicBool::new(true),
        changes: Mutex::new(Some(rx)),
    });
    let cache = OfflineCache::new(create_test_store().await);
    let core = CoreService::with_cache(
        config(Some(monitor.clone() as Arc<dyn NetworkMonitor>)),
        CoreDependencies::default(),
        cache,
    );

    assert!(core.is_online().await);
    monitor.online.store(false, Ordering::SeqCst);
    assert!(!core.is_online().await);
    monitor.online.store(true, Ordering::SeqCst);
    assert!(core.is_online().await);

    let mut events = core
        .events()
        .filter(|e| matches!(e, CoreEvent::Connectivity(_)));
    let handle = core.watch_connectivity().await.unwrap().unwrap();

    tx.send(NetworkInfo::disconnected()).unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Connectivity(ConnectivityEvent::Offline)
    );

    tx.send(NetworkInfo::disconnected()).unwrap();
    tx.send(NetworkInfo::connected(None)).unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Connectivity(ConnectivityEvent::Online)
    );

    drop(tx);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_no_monitor_means_online() {
    let cache = OfflineCache::new(create_test_store().await);
    let core = service_with(&cache, CoreDependencies::default());

    assert!(core.is_online().await);
    assert!(core.watch_connectivity().await.unwrap().is_none());
}

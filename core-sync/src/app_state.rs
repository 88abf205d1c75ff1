//! Last-session tracking
//!
//! Remembers which setlist and song were open so the next launch can resume.

use std::sync::Arc;

use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_library::LAST_APP_STATE_KEY;
use core_playback::OfflineCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Selection stored under the `lastAppState` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastAppState {
    #[serde(default)]
    pub last_setlist_id: Option<String>,
    pub last_song_id: String,
    pub last_used: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppStateTracker {
    cache: OfflineCache,
    clock: Arc<dyn Clock>,
}

impl AppStateTracker {
    pub fn new(cache: OfflineCache, clock: Arc<dyn Clock>) -> Self {
        Self { cache, clock }
    }

    /// Record the current selection. Returns `false` if it could not be saved.
    pub async fn save_last_app_state(&self, setlist_id: Option<&str>, song_id: &str) -> bool {
        let state = LastAppState {
            last_setlist_id: setlist_id.map(str::to_string),
            last_song_id: song_id.to_string(),
            last_used: self.clock.now(),
        };
        let saved = self.cache.save_app_state(LAST_APP_STATE_KEY, &state).await;
        if saved {
            debug!(song_id, ?setlist_id, "Saved last app state");
        }
        saved
    }

    pub async fn get_last_app_state(&self) -> Option<LastAppState> {
        self.cache.get_app_state(LAST_APP_STATE_KEY).await
    }
}

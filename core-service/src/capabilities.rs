//! Host capabilities used when resuming the last session.
//!
//! Hosts that cannot load songs from the network, or have no notion of a
//! default selection, use the no-op implementations.

use async_trait::async_trait;
use bridge_traits::error::Result;
use tracing::debug;

/// Loads a song that is not in the offline cache.
#[async_trait]
pub trait NetworkSongLoader: Send + Sync {
    async fn load_song(&self, song_id: &str) -> Result<()>;
}

/// Picks something to show when there is no previous session.
#[async_trait]
pub trait DefaultSelection: Send + Sync {
    async fn select_default(&self) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoNetworkSongLoader;

#[async_trait]
impl NetworkSongLoader for NoNetworkSongLoader {
    async fn load_song(&self, song_id: &str) -> Result<()> {
        debug!(song_id, "No network song loader configured");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoDefaultSelection;

#[async_trait]
impl DefaultSelection for NoDefaultSelection {
    async fn select_default(&self) -> Result<()> {
        debug!("No default selection configured");
        Ok(())
    }
}

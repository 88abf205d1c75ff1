//! Default on-disk locations

use bridge_traits::error::{BridgeError, Result};
use std::path::PathBuf;

/// Directory created under the platform data dir
pub const APP_DIR_NAME: &str = "stem-player";

/// Cache database file name
pub const DATABASE_FILE_NAME: &str = "offline-cache.db";

/// Platform data directory for the app, e.g. `~/.local/share/stem-player`.
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| {
            BridgeError::NotAvailable(
                "No data directory found for this user; set CoreConfig::database_path explicitly"
                    .to_string(),
            )
        })
}

/// Default path of the cache database. The parent directory is created.
pub fn default_database_path() -> Result<PathBuf> {
    let dir = default_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join(DATABASE_FILE_NAME))
}

//! Cache statistics

use serde::{Deserialize, Serialize};

/// Counts and size of the offline cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cached audio assets
    pub audio_files: u64,

    /// Number of cached song documents
    pub songs: u64,

    /// Number of cached setlist documents
    pub setlists: u64,

    /// Sum of `approxSizeBytes` over all audio assets
    pub total_size: u64,
}

impl CacheStats {
    /// Returns true when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.audio_files == 0 && self.songs == 0 && self.setlists == 0
    }

    /// Returns average bytes per audio asset.
    pub fn average_asset_size(&self) -> u64 {
        if self.audio_files == 0 {
            0
        } else {
            self.total_size / self.audio_files
        }
    }

    /// Total size in megabytes, for display.
    pub fn total_size_mb(&self) -> f64 {
        self.total_size as f64 / (1024.0 * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = CacheStats::default();
        assert!(stats.is_empty());
        assert_eq!(stats.average_asset_size(), 0);
    }

    #[test]
    fn test_derived_values() {
        let stats = CacheStats {
            audio_files: 4,
            songs: 2,
            setlists: 1,
            total_size: 4 * 1024 * 1024,
        };
        assert!(!stats.is_empty());
        assert_eq!(stats.average_asset_size(), 1024 * 1024);
        assert_eq!(stats.total_size_mb(), 4.0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(CacheStats {
            audio_files: 1,
            songs: 0,
            setlists: 0,
            total_size: 8,
        })
        .unwrap();
        assert_eq!(json["audioFiles"], 1);
        assert_eq!(json["totalSize"], 8);
    }
}

//! Versioned schema for the offline cache database.
//!
//! Each entry is applied once, in order, inside its own transaction. Entries
//! are additive only: a database opened at an older version gains the missing
//! tables and indexes without touching existing rows.

/// A single schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create cache collections",
        statements: &[
            "CREATE TABLE IF NOT EXISTS audio_files (
                id TEXT PRIMARY KEY NOT NULL,
                song_id TEXT NOT NULL,
                source_url TEXT NOT NULL,
                sample_rate INTEGER NOT NULL CHECK (sample_rate > 0),
                channel_count INTEGER NOT NULL CHECK (channel_count >= 1),
                frame_count INTEGER NOT NULL CHECK (frame_count >= 0),
                duration_seconds REAL NOT NULL,
                approx_size_bytes INTEGER NOT NULL,
                samples BLOB NOT NULL,
                cached_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_audio_files_song_id ON audio_files(song_id)",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_audio_files_source_url ON audio_files(source_url)",
            "CREATE TABLE IF NOT EXISTS songs (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                payload TEXT NOT NULL,
                cached_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS setlists (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                payload TEXT NOT NULL,
                cached_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS app_state (
                id TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        ],
    },
    Migration {
        version: 2,
        description: "index metadata names",
        statements: &[
            "CREATE INDEX IF NOT EXISTS idx_songs_name ON songs(name)",
            "CREATE INDEX IF NOT EXISTS idx_setlists_name ON setlists(name)",
        ],
    },
];

/// Version a freshly opened store ends up at
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_strictly_increase() {
        let versions: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(latest_version(), 2);
    }
}

//! Stored record types
//!
//! Records persisted by the [`LocalStore`](crate::store::LocalStore), one
//! type per collection, with validation and row mapping.

use bridge_traits::database::{QueryRow, QueryValue};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LibraryError, Result};
use crate::store::{Collection, StoreRecord};

/// Well-known `appState` key holding the sync status record
pub const SYNC_STATUS_KEY: &str = "syncStatus";

/// Well-known `appState` key holding the last-played selection
pub const LAST_APP_STATE_KEY: &str = "lastAppState";

/// Bytes per stored sample (`f32`)
pub const BYTES_PER_SAMPLE: u64 = 4;

// =============================================================================
// Channel Samples
// =============================================================================

/// Planar PCM samples: one plane per channel, every plane the same length.
///
/// Construction validates the shape, so holders can rely on
/// `channel_count() >= 1` and equal plane lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSamples {
    planes: Vec<Vec<f32>>,
}

impl ChannelSamples {
    pub fn new(planes: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = planes.first() else {
            return Err(LibraryError::InvalidRecord {
                collection: Collection::AudioFiles.name(),
                message: "audio must have at least one channel".to_string(),
            });
        };

        let frames = first.len();
        if let Some((index, plane)) = planes
            .iter()
            .enumerate()
            .find(|(_, plane)| plane.len() != frames)
        {
            return Err(LibraryError::InvalidRecord {
                collection: Collection::AudioFiles.name(),
                message: format!(
                    "channel {} has {} frames, expected {}",
                    index,
                    plane.len(),
                    frames
                ),
            });
        }

        Ok(Self { planes })
    }

    pub fn channel_count(&self) -> usize {
        self.planes.len()
    }

    pub fn frame_count(&self) -> usize {
        self.planes[0].len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.planes.get(index).map(Vec::as_slice)
    }

    pub fn planes(&self) -> &[Vec<f32>] {
        &self.planes
    }

    pub fn into_planes(self) -> Vec<Vec<f32>> {
        self.planes
    }

    /// `frame_count * channel_count * 4`
    pub fn approx_size_bytes(&self) -> u64 {
        self.frame_count() as u64 * self.channel_count() as u64 * BYTES_PER_SAMPLE
    }

    /// Channel-major little-endian `f32` bytes. Bit patterns are preserved.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.approx_size_bytes() as usize);
        for plane in &self.planes {
            for sample in plane {
                bytes.extend_from_slice(&sample.to_le_bytes());
            }
        }
        bytes
    }

    /// Inverse of [`to_le_bytes`](Self::to_le_bytes).
    pub fn from_le_bytes(bytes: &[u8], channel_count: usize, frame_count: usize) -> Result<Self> {
        let expected = channel_count * frame_count * BYTES_PER_SAMPLE as usize;
        if channel_count == 0 || bytes.len() != expected {
            return Err(LibraryError::InvalidRecord {
                collection: Collection::AudioFiles.name(),
                message: format!(
                    "sample blob is {} bytes, expected {} for {} channels x {} frames",
                    bytes.len(),
                    expected,
                    channel_count,
                    frame_count
                ),
            });
        }

        let plane_bytes = frame_count * BYTES_PER_SAMPLE as usize;
        let planes = (0..channel_count)
            .map(|channel| {
                let start = channel * plane_bytes;
                bytes[start..start + plane_bytes]
                    .chunks_exact(BYTES_PER_SAMPLE as usize)
                    .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect()
            })
            .collect();

        Self::new(planes)
    }
}

// =============================================================================
// Audio Assets
// =============================================================================

/// A decoded audio track stored for offline playback
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAudioAsset {
    pub track_id: String,
    pub song_id: String,
    pub source_url: String,
    pub sample_rate: u32,
    pub channels: ChannelSamples,
    pub cached_at: DateTime<Utc>,
}

impl CachedAudioAsset {
    pub fn new(
        track_id: impl Into<String>,
        song_id: impl Into<String>,
        source_url: impl Into<String>,
        sample_rate: u32,
        channels: ChannelSamples,
        cached_at: DateTime<Utc>,
    ) -> Result<Self> {
        let asset = Self {
            track_id: track_id.into(),
            song_id: song_id.into(),
            source_url: source_url.into(),
            sample_rate,
            channels,
            cached_at,
        };
        asset.validate()?;
        Ok(asset)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.channel_count()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.frame_count()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn approx_size_bytes(&self) -> u64 {
        self.channels.approx_size_bytes()
    }
}

impl StoreRecord for CachedAudioAsset {
    const COLLECTION: Collection = Collection::AudioFiles;

    fn key(&self) -> &str {
        &self.track_id
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(LibraryError::InvalidRecord {
                collection: Self::COLLECTION.name(),
                message: format!("{} ({})", message, self.track_id),
            })
        };

        if self.track_id.is_empty() {
            return invalid("track id is empty");
        }
        if self.source_url.is_empty() {
            return invalid("source url is empty");
        }
        if self.sample_rate == 0 {
            return invalid("sample rate must be positive");
        }
        Ok(())
    }

    fn to_columns(&self) -> Result<Vec<(&'static str, QueryValue)>> {
        Ok(vec![
            ("id", QueryValue::from(self.track_id.as_str())),
            ("song_id", QueryValue::from(self.song_id.as_str())),
            ("source_url", QueryValue::from(self.source_url.as_str())),
            ("sample_rate", QueryValue::Integer(self.sample_rate as i64)),
            ("channel_count", QueryValue::Integer(self.channel_count() as i64)),
            ("frame_count", QueryValue::Integer(self.frame_count() as i64)),
            ("duration_seconds", QueryValue::Real(self.duration_seconds())),
            (
                "approx_size_bytes",
                QueryValue::Integer(self.approx_size_bytes() as i64),
            ),
            ("samples", QueryValue::Blob(self.channels.to_le_bytes())),
            ("cached_at", QueryValue::Text(format_timestamp(&self.cached_at))),
        ])
    }

    fn from_row(row: &QueryRow) -> Result<Self> {
        let channel_count = required_i64(row, Self::COLLECTION, "channel_count")?;
        let frame_count = required_i64(row, Self::COLLECTION, "frame_count")?;
        let samples = row
            .get("samples")
            .and_then(QueryValue::as_bytes)
            .ok_or_else(|| missing_column(Self::COLLECTION, "samples"))?;

        Ok(Self {
            track_id: required_string(row, Self::COLLECTION, "id")?,
            song_id: required_string(row, Self::COLLECTION, "song_id")?,
            source_url: required_string(row, Self::COLLECTION, "source_url")?,
            sample_rate: required_i64(row, Self::COLLECTION, "sample_rate")? as u32,
            channels: ChannelSamples::from_le_bytes(
                samples,
                channel_count as usize,
                frame_count as usize,
            )?,
            cached_at: required_timestamp(row, Self::COLLECTION, "cached_at")?,
        })
    }
}

// =============================================================================
// Catalog Metadata
// =============================================================================

/// A track reference inside a song document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Remaining document fields, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Song metadata mirrored from the remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSongMetadata {
    pub song_id: String,
    pub name: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub bpm: Option<u32>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub track_refs: Vec<TrackRef>,
    #[serde(default)]
    pub extra: Map<String, Value>,
    pub cached_at: DateTime<Utc>,
}

impl CachedSongMetadata {
    /// Track id for the track at `index`: `{songId}_{index+1}`
    pub fn track_id(&self, index: usize) -> String {
        track_id_for(&self.song_id, index)
    }
}

/// Stable id of the `index`-th (0-based) track of a song
pub fn track_id_for(song_id: &str, index: usize) -> String {
    format!("{}_{}", song_id, index + 1)
}

/// Setlist metadata mirrored from the remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSetlistMetadata {
    pub setlist_id: String,
    pub name: String,
    #[serde(default)]
    pub song_ids: Vec<String>,
    #[serde(default)]
    pub extra: Map<String, Value>,
    pub cached_at: DateTime<Utc>,
}

macro_rules! json_document_record {
    ($ty:ty, $collection:expr, $key:ident) => {
        impl StoreRecord for $ty {
            const COLLECTION: Collection = $collection;

            fn key(&self) -> &str {
                &self.$key
            }

            fn validate(&self) -> Result<()> {
                if self.$key.is_empty() {
                    return Err(LibraryError::InvalidRecord {
                        collection: Self::COLLECTION.name(),
                        message: "record id is empty".to_string(),
                    });
                }
                Ok(())
            }

            fn to_columns(&self) -> Result<Vec<(&'static str, QueryValue)>> {
                Ok(vec![
                    ("id", QueryValue::from(self.$key.as_str())),
                    ("name", QueryValue::from(self.name.as_str())),
                    ("payload", QueryValue::Text(serde_json::to_string(self)?)),
                    ("cached_at", QueryValue::Text(format_timestamp(&self.cached_at))),
                ])
            }

            fn from_row(row: &QueryRow) -> Result<Self> {
                let payload = required_string(row, Self::COLLECTION, "payload")?;
                Ok(serde_json::from_str(&payload)?)
            }
        }
    };
}

json_document_record!(CachedSongMetadata, Collection::Songs, song_id);
json_document_record!(CachedSetlistMetadata, Collection::Setlists, setlist_id);

// =============================================================================
// App State
// =============================================================================

/// Opaque key-value entry in the `appState` collection
#[derive(Debug, Clone, PartialEq)]
pub struct AppStateEntry {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

impl StoreRecord for AppStateEntry {
    const COLLECTION: Collection = Collection::AppState;

    fn key(&self) -> &str {
        &self.key
    }

    fn to_columns(&self) -> Result<Vec<(&'static str, QueryValue)>> {
        Ok(vec![
            ("id", QueryValue::from(self.key.as_str())),
            ("value", QueryValue::Text(serde_json::to_string(&self.value)?)),
            ("updated_at", QueryValue::Text(format_timestamp(&self.updated_at))),
        ])
    }

    fn from_row(row: &QueryRow) -> Result<Self> {
        let value = required_string(row, Self::COLLECTION, "value")?;
        Ok(Self {
            key: required_string(row, Self::COLLECTION, "id")?,
            value: serde_json::from_str(&value)?,
            updated_at: required_timestamp(row, Self::COLLECTION, "updated_at")?,
        })
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

/// ISO-8601 UTC with millisecond precision, e.g. `2024-03-01T12:00:00.000Z`
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn missing_column(collection: Collection, column: &str) -> LibraryError {
    LibraryError::InvalidRecord {
        collection: collection.name(),
        message: format!("missing or invalid column `{}`", column),
    }
}

fn required_string(row: &QueryRow, collection: Collection, column: &str) -> Result<String> {
    row.get(column)
        .and_then(QueryValue::as_string)
        .ok_or_else(|| missing_column(collection, column))
}

fn required_i64(row: &QueryRow, collection: Collection, column: &str) -> Result<i64> {
    row.get(column)
        .and_then(QueryValue::as_i64)
        .filter(|value| *value >= 0)
        .ok_or_else(|| missing_column(collection, column))
}

fn required_timestamp(
    row: &QueryRow,
    collection: Collection,
    column: &str,
) -> Result<DateTime<Utc>> {
    let text = required_string(row, collection, column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| missing_column(collection, column))
}

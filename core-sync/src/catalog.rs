//! Catalog document parsing
//!
//! Turns raw catalog documents into the records the cache stores.
//!
//! Song documents look like
//! `{name, artist, tempo, key, tracks: [{name, audioUrl | downloadUrl}]}`
//! and setlist documents like `{name, songs: [songId]}`. Unknown fields are
//! kept in `extra` so nothing the catalog sends is lost. A malformed track
//! entry becomes a track without a URL, which the sync records as a
//! per-track failure instead of dropping the whole song.

use bridge_traits::catalog::{CatalogDocument, SETLISTS_COLLECTION, SONGS_COLLECTION};
use chrono::{DateTime, Utc};
use core_library::{CachedSetlistMetadata, CachedSongMetadata, TrackRef};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{Result, SyncError};

const SONG_FIELDS: [&str; 5] = ["name", "artist", "tempo", "key", "tracks"];
const SETLIST_FIELDS: [&str; 2] = ["name", "songs"];
const TRACK_FIELDS: [&str; 3] = ["name", "audioUrl", "downloadUrl"];

pub fn parse_song(doc: &CatalogDocument, cached_at: DateTime<Utc>) -> Result<CachedSongMetadata> {
    let body = object_body(doc, SONGS_COLLECTION)?;

    let track_refs = match body.get("tracks") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(tracks)) => tracks
            .iter()
            .enumerate()
            .map(|(index, track)| parse_track(doc, index, track))
            .collect(),
        Some(_) => return Err(invalid(doc, SONGS_COLLECTION, "`tracks` is not an array")),
    };

    Ok(CachedSongMetadata {
        song_id: doc.id.clone(),
        name: string_field(body, "name").unwrap_or_default(),
        artist: string_field(body, "artist"),
        bpm: body.get("tempo").and_then(parse_tempo),
        key: string_field(body, "key"),
        track_refs,
        extra: remaining(body, &SONG_FIELDS),
        cached_at,
    })
}

pub fn parse_setlist(
    doc: &CatalogDocument,
    cached_at: DateTime<Utc>,
) -> Result<CachedSetlistMetadata> {
    let body = object_body(doc, SETLISTS_COLLECTION)?;

    let song_ids = match body.get("songs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(songs)) => songs
            .iter()
            .filter_map(|s| s.as_str().map(str::to_string))
            .collect(),
        Some(_) => return Err(invalid(doc, SETLISTS_COLLECTION, "`songs` is not an array")),
    };

    Ok(CachedSetlistMetadata {
        setlist_id: doc.id.clone(),
        name: string_field(body, "name").unwrap_or_default(),
        song_ids,
        extra: remaining(body, &SETLIST_FIELDS),
        cached_at,
    })
}

fn parse_track(doc: &CatalogDocument, index: usize, track: &Value) -> TrackRef {
    let fallback_name = || format!("Track {}", index + 1);

    let Some(body) = track.as_object() else {
        warn!(song_id = %doc.id, track = index + 1, "Track entry is not an object");
        return TrackRef {
            name: fallback_name(),
            source_url: None,
            extra: Map::new(),
        };
    };

    let source_url = string_field(body, "audioUrl")
        .filter(|url| !url.is_empty())
        .or_else(|| string_field(body, "downloadUrl").filter(|url| !url.is_empty()));

    TrackRef {
        name: string_field(body, "name").unwrap_or_else(fallback_name),
        source_url,
        extra: remaining(body, &TRACK_FIELDS),
    }
}

/// `tempo` may arrive as a number or a numeric string
fn parse_tempo(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u32),
        _ => None,
    }
}

fn object_body<'a>(doc: &'a CatalogDocument, collection: &str) -> Result<&'a Map<String, Value>> {
    if doc.id.is_empty() {
        return Err(invalid(doc, collection, "document id is empty"));
    }
    doc.data
        .as_object()
        .ok_or_else(|| invalid(doc, collection, "document body is not an object"))
}

fn string_field(body: &Map<String, Value>, name: &str) -> Option<String> {
    body.get(name).and_then(Value::as_str).map(str::to_string)
}

fn remaining(body: &Map<String, Value>, known: &[&str]) -> Map<String, Value> {
    body.iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn invalid(doc: &CatalogDocument, collection: &str, message: &str) -> SyncError {
    SyncError::InvalidDocument {
        collection: collection.to_string(),
        id: doc.id.clone(),
        message: message.to_string(),
    }
}

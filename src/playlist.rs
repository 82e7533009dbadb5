//! Builds the FreeTube playlist document from raw `yt-dlp` records.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::MissingFieldError;
use crate::record::{Clock, MappedVideoRecord, RawVideoRecord, RecordMapper};

pub const PLAYLIST_ID_PREFIX: &str = "ft-playlist--";
pub const FALLBACK_PLAYLIST_NAME: &str = "Untitled playlist";

/// One line of FreeTube's `playlists.db`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRecord {
    pub playlist_name: String,
    pub protected: bool,
    pub description: String,
    pub videos: Vec<MappedVideoRecord>,
    #[serde(rename = "_id")]
    pub id: String,
    pub created_at: i64,
    pub last_updated_at: i64,
}

impl PlaylistRecord {
    pub fn new(playlist_name: String, videos: Vec<MappedVideoRecord>, now_millis: i64) -> Self {
        Self {
            playlist_name,
            protected: false,
            description: String::new(),
            videos,
            id: format!("{PLAYLIST_ID_PREFIX}{}", Uuid::new_v4()),
            created_at: now_millis,
            last_updated_at: now_millis,
        }
    }
}

/// Result of the first pass, before age-restricted videos are recovered.
#[derive(Debug)]
pub struct PlaylistAssembly {
    pub playlist: PlaylistRecord,
    /// Records dropped because a required field was missing.
    pub skipped: Vec<MissingFieldError>,
    /// True when neither an override nor a `playlist_title` was available.
    pub fallback_name: bool,
}

/// Maps every record in arrival order. Records missing a required field are
/// skipped and reported instead of failing the whole run.
pub fn assemble_playlist<C: Clock>(
    raw_records: &[RawVideoRecord],
    mapper: &mut RecordMapper<C>,
    name_override: Option<&str>,
) -> PlaylistAssembly {
    let extracted_name = raw_records
        .first()
        .and_then(|record| record.playlist_title.as_deref())
        .map(str::trim)
        .filter(|title| !title.is_empty());
    let chosen_name = name_override
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or(extracted_name);
    let fallback_name = chosen_name.is_none();
    if fallback_name {
        debug!("no playlist title available, using \"{FALLBACK_PLAYLIST_NAME}\"");
    }
    let playlist_name = chosen_name.unwrap_or(FALLBACK_PLAYLIST_NAME).to_owned();

    let mut videos = Vec::with_capacity(raw_records.len());
    let mut skipped = Vec::new();
    for (index, raw) in raw_records.iter().enumerate() {
        match mapper.map(raw, index + 1) {
            Ok(video) => videos.push(video),
            Err(err) => {
                debug!(position = err.position, field = err.field, "skipping record");
                skipped.push(err);
            }
        }
    }
    debug!(mapped = videos.len(), skipped = skipped.len(), "first pass mapped");

    let playlist = PlaylistRecord::new(playlist_name, videos, mapper.now_millis());
    PlaylistAssembly {
        playlist,
        skipped,
        fallback_name,
    }
}

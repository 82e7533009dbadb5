//! Raw `yt-dlp` video records and their FreeTube counterparts.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::MissingFieldError;

/// One video as printed by `yt-dlp`. Everything is optional because a
/// partially failed extraction simply leaves fields out. A field of the wrong
/// type (yt-dlp prints `"NA"` for unknown values) reads as missing, so the
/// mapper skips that one record instead of the whole buffer failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVideoRecord {
    #[serde(default, deserialize_with = "text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub channel_id: Option<String>,
    #[serde(default, deserialize_with = "whole_seconds")]
    pub duration: Option<i64>,
    #[serde(default, deserialize_with = "whole_seconds")]
    pub timestamp: Option<i64>,
    /// Only present on entries that came out of a playlist.
    #[serde(default, deserialize_with = "text")]
    pub playlist_title: Option<String>,
}

fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        _ => None,
    })
}

/// Some extractors report seconds as floats; FreeTube wants integers.
fn whole_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().map(|seconds| seconds.round() as i64))
}

/// A video entry in FreeTube's playlist schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedVideoRecord {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub author_id: String,
    pub length_seconds: i64,
    pub published: i64,
    pub time_added: i64,
    pub playlist_item_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

pub const VIDEO_KIND: &str = "video";

/// Source of capture timestamps in Unix milliseconds.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Maps raw records while handing out strictly increasing `timeAdded` values,
/// so records mapped within the same millisecond still sort in order.
pub struct RecordMapper<C = SystemClock> {
    clock: C,
    last_stamp: Option<i64>,
}

impl RecordMapper<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RecordMapper<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RecordMapper<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            last_stamp: None,
        }
    }

    /// Current time without advancing the per-record stamp.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    fn next_stamp(&mut self) -> i64 {
        let now = self.clock.now_millis();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    /// `position` is 1-based and only used for error reporting.
    pub fn map(
        &mut self,
        raw: &RawVideoRecord,
        position: usize,
    ) -> Result<MappedVideoRecord, MissingFieldError> {
        let missing = |field| MissingFieldError { field, position };

        let video_id = raw
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing("id"))?;
        let title = raw.title.as_deref().ok_or_else(|| missing("title"))?;
        let author = raw.channel.as_deref().ok_or_else(|| missing("channel"))?;
        let author_id = raw
            .channel_id
            .as_deref()
            .ok_or_else(|| missing("channel_id"))?;
        let length_seconds = raw.duration.ok_or_else(|| missing("duration"))?;
        let published = raw.timestamp.ok_or_else(|| missing("timestamp"))?;

        Ok(MappedVideoRecord {
            video_id: video_id.to_owned(),
            title: title.to_owned(),
            author: author.to_owned(),
            author_id: author_id.to_owned(),
            length_seconds,
            published,
            time_added: self.next_stamp(),
            playlist_item_id: Uuid::new_v4().to_string(),
            kind: VIDEO_KIND.to_owned(),
        })
    }
}

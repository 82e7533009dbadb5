//! YouTube video identifiers.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // 10 free characters, the last one only carries 2 bits of the 64-bit id.
    static ref EXACT_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{10}[AEIMQUYcgkosw048]$").unwrap();
    static ref EMBEDDED_ID_RE: Regex =
        Regex::new(r"(?:^|[^A-Za-z0-9_-])([A-Za-z0-9_-]{10}[AEIMQUYcgkosw048])(?:[^A-Za-z0-9_-]|$)")
            .unwrap();
}

/// An 11 character video id that matched the platform's id grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    pub fn parse(value: &str) -> Option<Self> {
        EXACT_ID_RE
            .is_match(value)
            .then(|| Self(value.to_owned()))
    }

    /// Returns the first standalone id inside a line of extractor output, e.g.
    /// `ERROR: [youtube] dQw4w9WgXcQ: Sign in to confirm your age.`
    pub fn find_in(line: &str) -> Option<Self> {
        EMBEDDED_ID_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VideoId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid video id: {value}"))
    }
}

impl From<VideoId> for String {
    fn from(value: VideoId) -> Self {
        value.0
    }
}

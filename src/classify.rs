//! Sorts every line of `yt-dlp` output into data, errors, and noise.
//!
//! `yt-dlp` is started with stderr folded into stdout, so a single stream mixes
//! pretty-printed JSON fragments, `ERROR:` lines for individual videos, and in
//! the worst case its whole CLI usage text. The classifier only looks at one
//! line at a time and keeps a single bit of state: whether the first line has
//! been seen yet.

use crate::error::ImportError;
use crate::video_id::VideoId;

/// Only ever printed as the first line when the playlist is missing/private.
pub const PLAYLIST_MISSING_MARKER: &str = "The playlist does not exist";
pub const AGE_RESTRICTION_MARKER: &str = "Sign in to confirm your age";
pub const UNSUPPORTED_BROWSER_MARKER: &str = "unsupported browser specified for cookies";
const ERROR_PREFIX: &str = "ERROR";
const USAGE_PREFIX: &str = "Usage";

/// The two conditions that end a run on the spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fatal {
    PlaylistNotFound,
    UnsupportedBrowser,
}

impl From<Fatal> for ImportError {
    fn from(value: Fatal) -> Self {
        match value {
            Fatal::PlaylistNotFound => ImportError::PlaylistNotFound,
            Fatal::UnsupportedBrowser => ImportError::UnsupportedBrowser,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Fatal(Fatal),
    /// Extraction of one video failed; the rest of the playlist continues.
    PlainError,
    /// Failed behind the age gate although cookies were supplied.
    AgeRestricted(VideoId),
    /// Usage text or blank lines.
    Noise,
    /// Part of a JSON object.
    Data,
}

impl LineKind {
    pub fn is_error(&self) -> bool {
        matches!(self, LineKind::PlainError | LineKind::AgeRestricted(_))
    }
}

#[derive(Debug, Clone)]
pub struct LineClassifier {
    cookies_supplied: bool,
    seen_first_line: bool,
}

impl LineClassifier {
    pub fn new(cookies_supplied: bool) -> Self {
        Self {
            cookies_supplied,
            seen_first_line: false,
        }
    }

    pub fn classify(&mut self, line: &str) -> LineKind {
        let first_line = !self.seen_first_line;
        self.seen_first_line = true;

        if first_line && line.contains(PLAYLIST_MISSING_MARKER) {
            return LineKind::Fatal(Fatal::PlaylistNotFound);
        }

        if line.starts_with(ERROR_PREFIX) {
            if self.cookies_supplied
                && line.contains(AGE_RESTRICTION_MARKER)
                && let Some(id) = VideoId::find_in(line)
            {
                return LineKind::AgeRestricted(id);
            }
            return LineKind::PlainError;
        }

        if line.contains(UNSUPPORTED_BROWSER_MARKER) {
            return LineKind::Fatal(Fatal::UnsupportedBrowser);
        }

        if line.starts_with(USAGE_PREFIX) || line.trim().is_empty() {
            return LineKind::Noise;
        }

        LineKind::Data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGE_LINE: &str = "ERROR: [youtube] dQw4w9WgXcQ: Sign in to confirm your age. This video may be inappropriate for some users.";

    #[test]
    fn missing_playlist_on_first_line_is_fatal() {
        let mut classifier = LineClassifier::new(false);
        let kind = classifier.classify(
            "ERROR: [youtube:tab] PLxyz: YouTube said: The playlist does not exist.",
        );
        assert_eq!(kind, LineKind::Fatal(Fatal::PlaylistNotFound));
    }

    #[test]
    fn missing_playlist_marker_later_is_a_plain_error() {
        let mut classifier = LineClassifier::new(false);
        assert_eq!(classifier.classify("{"), LineKind::Data);
        assert_eq!(
            classifier.classify("ERROR: YouTube said: The playlist does not exist."),
            LineKind::PlainError
        );
    }

    #[test]
    fn first_data_line_is_kept() {
        let mut classifier = LineClassifier::new(false);
        assert_eq!(classifier.classify("{"), LineKind::Data);
        assert_eq!(classifier.classify("  \"id\": \"dQw4w9WgXcQ\","), LineKind::Data);
    }

    #[test]
    fn age_restriction_with_cookies_captures_id() {
        let mut classifier = LineClassifier::new(true);
        assert_eq!(
            classifier.classify(AGE_LINE),
            LineKind::AgeRestricted(VideoId::parse("dQw4w9WgXcQ").unwrap())
        );
    }

    #[test]
    fn age_restriction_without_cookies_is_plain() {
        let mut classifier = LineClassifier::new(false);
        assert_eq!(classifier.classify(AGE_LINE), LineKind::PlainError);
    }

    #[test]
    fn age_restriction_without_id_is_plain() {
        let mut classifier = LineClassifier::new(true);
        assert_eq!(
            classifier.classify("ERROR: Sign in to confirm your age."),
            LineKind::PlainError
        );
    }

    #[test]
    fn other_errors_are_plain() {
        let mut classifier = LineClassifier::new(true);
        let kind = classifier.classify("ERROR: [youtube] aaaaaaaaaaA: Private video");
        assert_eq!(kind, LineKind::PlainError);
        assert!(kind.is_error());
    }

    #[test]
    fn unsupported_browser_is_fatal() {
        let mut classifier = LineClassifier::new(true);
        classifier.classify("Usage: yt-dlp [OPTIONS] URL [URL...]");
        assert_eq!(
            classifier.classify(
                "yt-dlp: error: unsupported browser specified for cookies: \"netscape\""
            ),
            LineKind::Fatal(Fatal::UnsupportedBrowser)
        );
    }

    #[test]
    fn usage_and_blank_lines_are_noise() {
        let mut classifier = LineClassifier::new(false);
        assert_eq!(classifier.classify("Usage: yt-dlp [OPTIONS] URL"), LineKind::Noise);
        assert_eq!(classifier.classify(""), LineKind::Noise);
        assert_eq!(classifier.classify("   "), LineKind::Noise);
    }
}

//! One full import run: classify the playlist stream, build the playlist,
//! then recover age-restricted videos.

use std::time::Duration;

use tracing::{debug, info};

use crate::classify::{LineClassifier, LineKind};
use crate::error::{ImportError, ImportResult, MissingFieldError};
use crate::extractor::Extractor;
use crate::fragments::FragmentAssembler;
use crate::playlist::{PlaylistRecord, assemble_playlist};
use crate::record::{Clock, RawVideoRecord, RecordMapper};
use crate::recovery::{RecoveryOutcome, recover_age_restricted};
use crate::report::Reporter;
use crate::video_id::VideoId;

/// Inputs for a single run. Nothing survives between runs.
#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    pub playlist_url: String,
    /// Whether yt-dlp was given `--cookies-from-browser`. Age-restricted
    /// failures are only worth retrying when it was.
    pub cookies_supplied: bool,
    /// Wait before every recovery call.
    pub delay: Option<Duration>,
    pub playlist_name: Option<String>,
}

#[derive(Debug)]
pub struct ImportOutcome {
    pub playlist: PlaylistRecord,
    pub skipped: Vec<MissingFieldError>,
    /// Error lines that were not queued for recovery.
    pub plain_errors: usize,
    pub recovery: RecoveryOutcome,
    pub fallback_name: bool,
}

/// Result of reading the playlist stream once.
#[derive(Debug, Default)]
pub struct FirstPass {
    pub records: Vec<RawVideoRecord>,
    pub age_restricted: Vec<VideoId>,
    pub plain_errors: usize,
}

pub fn run_import<E, C, R>(
    config: &ImportConfig,
    extractor: &E,
    mapper: &mut RecordMapper<C>,
    reporter: &mut R,
) -> ImportResult<ImportOutcome>
where
    E: Extractor,
    C: Clock,
    R: Reporter,
{
    let first_pass = extract_playlist(config, extractor, reporter)?;
    info!(
        records = first_pass.records.len(),
        age_restricted = first_pass.age_restricted.len(),
        plain_errors = first_pass.plain_errors,
        "playlist stream finished"
    );

    let assembly = assemble_playlist(
        &first_pass.records,
        mapper,
        config.playlist_name.as_deref(),
    );
    for skipped in &assembly.skipped {
        reporter.skipped_record(skipped);
    }
    let mut playlist = assembly.playlist;

    let recovery = if config.cookies_supplied {
        recover_age_restricted(
            extractor,
            &first_pass.age_restricted,
            config.delay,
            mapper,
            &mut playlist,
            reporter,
        )
    } else {
        RecoveryOutcome::default()
    };

    Ok(ImportOutcome {
        playlist,
        skipped: assembly.skipped,
        plain_errors: first_pass.plain_errors,
        recovery,
        fallback_name: assembly.fallback_name,
    })
}

/// Reads the playlist stream line by line. Returning early on a fatal line
/// drops the stream, which stops the extractor without reading further.
pub fn extract_playlist<E, R>(
    config: &ImportConfig,
    extractor: &E,
    reporter: &mut R,
) -> ImportResult<FirstPass>
where
    E: Extractor,
    R: Reporter,
{
    let lines = extractor.playlist(&config.playlist_url)?;
    let mut classifier = LineClassifier::new(config.cookies_supplied);
    let mut assembler = FragmentAssembler::new();
    let mut age_restricted: Vec<VideoId> = Vec::new();
    let mut plain_errors = 0;

    for line in lines {
        let line = line.map_err(ImportError::Stream)?;
        match classifier.classify(&line) {
            LineKind::Fatal(fatal) => {
                reporter.extractor_error(&line);
                return Err(fatal.into());
            }
            LineKind::AgeRestricted(video_id) => {
                reporter.extractor_error(&line);
                if !age_restricted.contains(&video_id) {
                    debug!(%video_id, "queued for recovery");
                    age_restricted.push(video_id);
                }
            }
            LineKind::PlainError => {
                reporter.extractor_error(&line);
                plain_errors += 1;
            }
            LineKind::Noise => {}
            LineKind::Data => {
                reporter.data_line(&line);
                assembler.push_line(&line);
            }
        }
    }

    debug!(lines = assembler.line_count(), "assembling data lines");
    let records = assembler.finish()?;
    Ok(FirstPass {
        records,
        age_restricted,
        plain_errors,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::record::tests::FixedClock;
    use crate::report::tests::RecordingReporter;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::io;
    use std::rc::Rc;

    pub(crate) fn video_json(id: &str, title: &str, playlist: Option<&str>) -> String {
        let mut value = serde_json::json!({
            "id": id,
            "title": title,
            "channel": "Channel",
            "channel_id": "UCchannel",
            "duration": 100,
            "timestamp": 1_600_000_000,
        });
        if let Some(playlist) = playlist {
            value["playlist_title"] = playlist.into();
        }
        serde_json::to_string_pretty(&value).unwrap()
    }

    pub(crate) struct CountingLines {
        inner: std::vec::IntoIter<io::Result<String>>,
        consumed: Rc<Cell<usize>>,
    }

    impl Iterator for CountingLines {
        type Item = io::Result<String>;

        fn next(&mut self) -> Option<Self::Item> {
            let item = self.inner.next();
            if item.is_some() {
                self.consumed.set(self.consumed.get() + 1);
            }
            item
        }
    }

    /// In-memory stand-in for yt-dlp. Output is given as text and split into
    /// lines exactly like the real stream.
    #[derive(Default)]
    pub(crate) struct FakeExtractor {
        playlist_output: String,
        videos: HashMap<String, String>,
        video_calls: RefCell<Vec<String>>,
        consumed: Rc<Cell<usize>>,
    }

    impl FakeExtractor {
        pub(crate) fn with_playlist(mut self, output: String) -> Self {
            self.playlist_output = output;
            self
        }

        pub(crate) fn with_video(mut self, id: &str, output: String) -> Self {
            self.videos.insert(id.to_owned(), output);
            self
        }

        pub(crate) fn video_calls(&self) -> Vec<String> {
            self.video_calls.borrow().clone()
        }

        pub(crate) fn consumed(&self) -> usize {
            self.consumed.get()
        }

        fn lines(&self, text: &str) -> CountingLines {
            let lines: Vec<io::Result<String>> =
                text.lines().map(|line| Ok(line.to_owned())).collect();
            CountingLines {
                inner: lines.into_iter(),
                consumed: Rc::clone(&self.consumed),
            }
        }
    }

    impl Extractor for FakeExtractor {
        type Lines = CountingLines;

        fn playlist(&self, _url: &str) -> ImportResult<CountingLines> {
            Ok(self.lines(&self.playlist_output))
        }

        fn video(&self, video_id: &VideoId) -> ImportResult<CountingLines> {
            self.video_calls.borrow_mut().push(video_id.to_string());
            match self.videos.get(video_id.as_str()) {
                Some(output) => Ok(self.lines(output)),
                None => Err(ImportError::Spawn {
                    program: "fake".into(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no such video"),
                }),
            }
        }
    }

    fn config(cookies_supplied: bool) -> ImportConfig {
        ImportConfig {
            playlist_url: "https://www.youtube.com/playlist?list=PLtest".into(),
            cookies_supplied,
            ..ImportConfig::default()
        }
    }

    fn run(
        config: &ImportConfig,
        extractor: &FakeExtractor,
    ) -> (ImportResult<ImportOutcome>, RecordingReporter) {
        let mut mapper = RecordMapper::with_clock(FixedClock(Cell::new(1_000)));
        let mut reporter = RecordingReporter::default();
        let result = run_import(config, extractor, &mut mapper, &mut reporter);
        (result, reporter)
    }

    #[test]
    fn two_clean_videos_keep_emitted_order() -> ImportResult<()> {
        let output = [
            video_json("aaaaaaaaaaA", "first", Some("Mix")),
            video_json("bbbbbbbbbbE", "second", Some("Mix")),
        ]
        .join("\n");
        let extractor = FakeExtractor::default().with_playlist(output);
        let (result, _reporter) = run(&config(false), &extractor);
        let outcome = result?;

        let playlist = outcome.playlist;
        assert_eq!(playlist.playlist_name, "Mix");
        assert_eq!(playlist.videos.len(), 2);
        assert_eq!(playlist.videos[0].video_id, "aaaaaaaaaaA");
        assert_eq!(playlist.videos[1].video_id, "bbbbbbbbbbE");
        assert_ne!(
            playlist.videos[0].playlist_item_id,
            playlist.videos[1].playlist_item_id
        );
        assert_eq!(outcome.plain_errors, 0);
        assert!(extractor.video_calls().is_empty());
        Ok(())
    }

    #[test]
    fn missing_playlist_aborts_without_reading_further() {
        let output = format!(
            "ERROR: [youtube:tab] PLtest: YouTube said: The playlist does not exist.\n{}",
            video_json("aaaaaaaaaaA", "first", Some("Mix"))
        );
        let extractor = FakeExtractor::default().with_playlist(output);
        let (result, reporter) = run(&config(false), &extractor);

        assert!(matches!(result, Err(ImportError::PlaylistNotFound)));
        assert_eq!(extractor.consumed(), 1);
        assert_eq!(reporter.events.len(), 1);
    }

    #[test]
    fn unsupported_browser_aborts() {
        let output = "Usage: yt-dlp [OPTIONS] URL [URL...]\n\nyt-dlp: error: unsupported browser specified for cookies: \"lynx\". Supported browsers are: brave, chrome\n".to_string();
        let extractor = FakeExtractor::default().with_playlist(output);
        let (result, _reporter) = run(&config(true), &extractor);
        assert!(matches!(result, Err(ImportError::UnsupportedBrowser)));
    }

    #[test]
    fn age_restricted_video_is_recovered_and_appended_last() -> ImportResult<()> {
        let output = [
            video_json("aaaaaaaaaaA", "first", Some("Mix")),
            "ERROR: [youtube] cccccccccc0: Sign in to confirm your age. This video may be inappropriate for some users.".to_string(),
            video_json("bbbbbbbbbbE", "second", Some("Mix")),
        ]
        .join("\n");
        let extractor = FakeExtractor::default()
            .with_playlist(output)
            .with_video("cccccccccc0", video_json("cccccccccc0", "restricted", None));
        let (result, _reporter) = run(&config(true), &extractor);
        let outcome = result?;

        let order: Vec<&str> = outcome
            .playlist
            .videos
            .iter()
            .map(|video| video.video_id.as_str())
            .collect();
        assert_eq!(order, vec!["aaaaaaaaaaA", "bbbbbbbbbbE", "cccccccccc0"]);
        assert_eq!(extractor.video_calls(), vec!["cccccccccc0".to_string()]);
        assert_eq!(outcome.recovery.recovered.len(), 1);
        Ok(())
    }

    #[test]
    fn without_cookies_age_restriction_is_a_plain_error() -> ImportResult<()> {
        let output = [
            video_json("aaaaaaaaaaA", "first", Some("Mix")),
            "ERROR: [youtube] cccccccccc0: Sign in to confirm your age.".to_string(),
        ]
        .join("\n");
        let extractor = FakeExtractor::default().with_playlist(output);
        let (result, _reporter) = run(&config(false), &extractor);
        let outcome = result?;

        assert_eq!(outcome.playlist.videos.len(), 1);
        assert_eq!(outcome.plain_errors, 1);
        assert!(extractor.video_calls().is_empty());
        Ok(())
    }

    #[test]
    fn duplicate_age_restricted_ids_are_recovered_once() -> ImportResult<()> {
        let line = "ERROR: [youtube] cccccccccc0: Sign in to confirm your age.";
        let output = [line, line].join("\n");
        let extractor = FakeExtractor::default()
            .with_playlist(output)
            .with_video("cccccccccc0", video_json("cccccccccc0", "restricted", None));
        let (result, _reporter) = run(&config(true), &extractor);
        let outcome = result?;
        assert_eq!(outcome.playlist.videos.len(), 1);
        assert_eq!(extractor.video_calls().len(), 1);
        Ok(())
    }

    #[test]
    fn empty_stream_builds_an_empty_playlist() -> ImportResult<()> {
        let extractor = FakeExtractor::default();
        let (result, _reporter) = run(&config(false), &extractor);
        let outcome = result?;
        assert!(outcome.playlist.videos.is_empty());
        assert!(outcome.fallback_name);
        Ok(())
    }

    #[test]
    fn truncated_json_is_fatal() {
        let extractor =
            FakeExtractor::default().with_playlist("{\n  \"id\": \"aaaaaaaaaaA\",\n".into());
        let (result, _reporter) = run(&config(false), &extractor);
        assert!(matches!(result, Err(ImportError::MalformedOutput(_))));
    }

    #[test]
    fn data_and_errors_are_echoed_in_arrival_order() -> ImportResult<()> {
        let output = "{\n\"id\": \"aaaaaaaaaaA\", \"title\": \"t\", \"channel\": \"c\", \"channel_id\": \"u\", \"duration\": 1, \"timestamp\": 2\n}\nERROR: boom".to_string();
        let extractor = FakeExtractor::default().with_playlist(output);
        let (result, reporter) = run(&config(false), &extractor);
        result?;
        assert_eq!(reporter.events.first().map(String::as_str), Some("data {"));
        assert_eq!(reporter.events.last().map(String::as_str), Some("error ERROR: boom"));
        Ok(())
    }

    #[test]
    fn wrongly_typed_record_is_skipped_and_the_rest_kept() -> ImportResult<()> {
        let mut broken: serde_json::Value =
            serde_json::from_str(&video_json("bbbbbbbbbbE", "second", Some("Mix"))).unwrap();
        broken["duration"] = "NA".into();
        let output = format!(
            "{}\n{}",
            video_json("aaaaaaaaaaA", "first", Some("Mix")),
            serde_json::to_string_pretty(&broken).unwrap()
        );
        let extractor = FakeExtractor::default().with_playlist(output);
        let (result, reporter) = run(&config(false), &extractor);
        let outcome = result?;

        assert_eq!(outcome.playlist.videos.len(), 1);
        assert_eq!(outcome.playlist.videos[0].video_id, "aaaaaaaaaaA");
        assert_eq!(
            outcome.skipped,
            vec![MissingFieldError {
                field: "duration",
                position: 2
            }]
        );
        assert!(reporter.events.contains(&"skipped 2".to_string()));
        Ok(())
    }

    #[test]
    fn records_missing_fields_are_reported_and_skipped() -> ImportResult<()> {
        let output = format!(
            "{}\n{{\"id\": \"bbbbbbbbbbE\", \"title\": \"no channel\"}}",
            video_json("aaaaaaaaaaA", "first", Some("Mix"))
        );
        let extractor = FakeExtractor::default().with_playlist(output);
        let (result, reporter) = run(&config(false), &extractor);
        let outcome = result?;
        assert_eq!(outcome.playlist.videos.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(reporter.events.contains(&"skipped 2".to_string()));
        Ok(())
    }
}

//! User-facing output: echoing yt-dlp lines and the final banners.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;

use crate::error::{FailedRecovery, ImportError, MissingFieldError};
use crate::record::MappedVideoRecord;
use crate::video_id::VideoId;

/// How much of the extractor's output is echoed while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Echo every data line as it arrives.
    #[default]
    Normal,
    /// Skip the live echo but still print the finished playlist.
    Quiet,
    /// Only ytftpl's own error and success messages (plus yt-dlp errors).
    Silent,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, silent: bool) -> Self {
        if silent {
            Self::Silent
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }
}

/// Receives everything the pipeline wants the user to see.
pub trait Reporter {
    fn data_line(&mut self, line: &str);
    fn extractor_error(&mut self, line: &str);
    fn skipped_record(&mut self, error: &MissingFieldError);
    fn recovering(&mut self, video_id: &VideoId);
    fn recovered(&mut self, video: &MappedVideoRecord);
    fn recovery_failed(&mut self, failure: &FailedRecovery);
}

pub struct Console {
    verbosity: Verbosity,
    color: bool,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Console {
    pub fn new(verbosity: Verbosity) -> Self {
        let color = io::stdout().is_terminal();
        Self::with_writers(verbosity, color, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(
        verbosity: Verbosity,
        color: bool,
        out: Box<dyn Write>,
        err: Box<dyn Write>,
    ) -> Self {
        Self {
            verbosity,
            color,
            out,
            err,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn paint_red(&self, text: &str) -> String {
        if self.color { text.red().to_string() } else { text.to_owned() }
    }

    fn paint_yellow(&self, text: &str) -> String {
        if self.color { text.yellow().to_string() } else { text.to_owned() }
    }

    fn paint_green(&self, text: &str) -> String {
        if self.color { text.green().to_string() } else { text.to_owned() }
    }

    /// Printed once the playlist is complete, unless running silent.
    pub fn playlist_json(&mut self, json: &str) {
        if self.verbosity != Verbosity::Silent {
            let _ = writeln!(self.out, "{json}");
        }
    }

    pub fn fatal(&mut self, error: &ImportError) {
        let prefix = self.paint_yellow(&format!("ytftpl - {}: ", error.label()));
        let _ = writeln!(self.err, "{prefix}{}", describe_fatal(error));
    }

    pub fn warning(&mut self, message: &str) {
        let prefix = self.paint_yellow("ytftpl: ");
        let _ = writeln!(self.err, "{prefix}{message}");
    }

    pub fn success(&mut self, playlist_name: &str, video_count: usize) {
        let prefix = self.paint_green("ytftpl: ");
        let _ = writeln!(
            self.out,
            "{prefix}Playlist '{playlist_name}' ({video_count} videos) successfully added to FreeTube!"
        );
    }

    pub fn dry_run(&mut self, playlist_name: &str) {
        let prefix = self.paint_green("ytftpl: ");
        let _ = writeln!(
            self.out,
            "{prefix}Dry run, playlist '{playlist_name}' was not written."
        );
    }
}

fn describe_fatal(error: &ImportError) -> String {
    match error {
        ImportError::PlaylistNotFound => "Playlist either doesn't exist or you are trying to access a private playlist without cookies.".to_owned(),
        ImportError::UnsupportedBrowser => {
            "Unsupported browser specified in -c / --browser-cookies flag.".to_owned()
        }
        other => other.to_string(),
    }
}

impl Reporter for Console {
    fn data_line(&mut self, line: &str) {
        if self.verbosity == Verbosity::Normal {
            let _ = writeln!(self.out, "{line}");
        }
    }

    fn extractor_error(&mut self, line: &str) {
        // Colour the "ERROR:" tag and leave the message readable.
        let split = line
            .char_indices()
            .nth(6)
            .map(|(index, _)| index)
            .unwrap_or(line.len());
        let (tag, rest) = line.split_at(split);
        let tag = self.paint_red(tag);
        let _ = writeln!(self.err, "{tag}{rest}");
    }

    fn skipped_record(&mut self, error: &MissingFieldError) {
        self.warning(&format!("skipped a video: {error}"));
    }

    fn recovering(&mut self, video_id: &VideoId) {
        if self.verbosity != Verbosity::Silent {
            let _ = writeln!(self.out, "Retrying age-restricted video {video_id}");
        }
    }

    fn recovered(&mut self, video: &MappedVideoRecord) {
        if self.verbosity == Verbosity::Normal {
            let _ = writeln!(self.out, "Recovered {} ({})", video.title, video.video_id);
        }
    }

    fn recovery_failed(&mut self, failure: &FailedRecovery) {
        self.warning(&format!(
            "could not recover {}: {}",
            failure.video_id, failure.error
        ));
    }
}

//! Runs `yt-dlp` and exposes its merged stdout/stderr as a line stream.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, PipeReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use anyhow::{Result, bail};
use tracing::debug;

use crate::error::{ImportError, ImportResult};
use crate::video_id::VideoId;

pub const DEFAULT_PROGRAM: &str = "yt-dlp";
const PLAYLIST_TEMPLATE: &str =
    "%(.{playlist_title,id,title,channel,channel_id,duration,timestamp})#j";
const VIDEO_TEMPLATE: &str = "%(.{id,title,channel,channel_id,duration,timestamp})#j";

/// Everything that stays the same across the playlist call and the
/// per-video recovery calls.
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub program: PathBuf,
    /// Browser to borrow cookies from (`--cookies-from-browser`).
    pub browser: Option<String>,
    /// Forwarded as `--sleep-requests`.
    pub sleep_seconds: Option<u64>,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            browser: None,
            sleep_seconds: None,
        }
    }
}

/// Seam between the pipeline and the process that produces metadata lines.
pub trait Extractor {
    type Lines: Iterator<Item = io::Result<String>>;

    fn playlist(&self, url: &str) -> ImportResult<Self::Lines>;

    fn video(&self, video_id: &VideoId) -> ImportResult<Self::Lines>;
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    options: ExtractorOptions,
}

impl YtDlp {
    pub fn new(options: ExtractorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Runs `<program> --version` to fail loudly when yt-dlp is missing.
    pub fn ensure_available(&self) -> Result<()> {
        let name = self.options.program.display();
        let status = Command::new(&self.options.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => bail!("{name} is installed but returned a failure status"),
            Err(err) => bail!("{name} is not installed or not in PATH: {err}"),
        }
    }

    /// Arguments for one invocation, in the order yt-dlp receives them.
    pub fn arguments(&self, url: &str, template: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            url.into(),
            "--quiet".into(),
            "--no-warnings".into(),
            "--skip-download".into(),
            "--ignore-errors".into(),
            "--print".into(),
            template.into(),
        ];
        if let Some(browser) = &self.options.browser {
            args.push("--cookies-from-browser".into());
            args.push(browser.into());
        }
        if let Some(seconds) = self.options.sleep_seconds {
            args.push("--sleep-requests".into());
            args.push(seconds.to_string().into());
        }
        args
    }

    fn spawn(&self, url: &str, template: &str) -> ImportResult<OutputLines> {
        let program = self.options.program.display().to_string();
        let spawn_error = |source| ImportError::Spawn {
            program: program.clone(),
            source,
        };

        // One pipe for both streams keeps errors interleaved with data in the
        // order yt-dlp printed them.
        let (reader, writer) = io::pipe().map_err(spawn_error)?;
        let writer_for_stderr = writer.try_clone().map_err(spawn_error)?;

        let mut command = Command::new(&self.options.program);
        command
            .args(self.arguments(url, template))
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_for_stderr);
        debug!(?command, "starting extractor");

        let child = command.spawn().map_err(spawn_error)?;
        // Our copies of the write end live in `command`; drop them so the
        // reader sees EOF once the child exits.
        drop(command);

        Ok(OutputLines {
            child,
            reader: BufReader::new(reader),
            finished: false,
        })
    }
}

impl Extractor for YtDlp {
    type Lines = OutputLines;

    fn playlist(&self, url: &str) -> ImportResult<OutputLines> {
        self.spawn(url, PLAYLIST_TEMPLATE)
    }

    fn video(&self, video_id: &VideoId) -> ImportResult<OutputLines> {
        self.spawn(&video_id.watch_url(), VIDEO_TEMPLATE)
    }
}

/// Lines from a running extractor. Dropping the stream early kills the child;
/// either way it is reaped.
pub struct OutputLines {
    child: Child,
    reader: BufReader<PipeReader>,
    finished: bool,
}

impl Iterator for OutputLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut raw = Vec::new();
        match self.reader.read_until(b'\n', &mut raw) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => {
                if raw.ends_with(b"\n") {
                    raw.pop();
                    if raw.ends_with(b"\r") {
                        raw.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&raw).into_owned()))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl Drop for OutputLines {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
        }
        match self.child.wait() {
            Ok(status) => debug!(%status, "extractor exited"),
            Err(err) => debug!(error = %err, "could not reap extractor"),
        }
    }
}

//! Error types shared by the import pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::video_id::VideoId;

pub type ImportResult<T> = Result<T, ImportError>;

/// Conditions that abort a run before anything is written to the database.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("playlist either doesn't exist or is private and no cookies were given")]
    PlaylistNotFound,

    #[error("unsupported browser specified for cookies")]
    UnsupportedBrowser,

    #[error("the path '{}' couldn't be found", .0.display())]
    DatabaseNotFound(PathBuf),

    #[error("yt-dlp produced output that is not valid JSON: {0}")]
    MalformedOutput(#[source] serde_json::Error),

    #[error("yt-dlp produced a JSON value that is not an object at entry {position}")]
    UnexpectedValue { position: usize },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read yt-dlp output: {0}")]
    Stream(#[source] io::Error),

    #[error("failed to write {}: {source}", path.display())]
    Database {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize playlist: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ImportError {
    /// Short label used in front of the user-facing message.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PlaylistNotFound => "PlaylistDoesntExistError",
            Self::UnsupportedBrowser => "UnsupportedBrowserError",
            Self::DatabaseNotFound(_) => "PlaylistDatabaseNotFoundError",
            Self::MalformedOutput(_) | Self::UnexpectedValue { .. } => "MalformedOutputError",
            Self::Spawn { .. } | Self::Stream(_) => "ExtractorError",
            Self::Database { .. } | Self::Serialize(_) => "DatabaseWriteError",
        }
    }
}

/// A raw record lacked one of the fields the target schema needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {position} is missing required field `{field}`")]
pub struct MissingFieldError {
    pub field: &'static str,
    pub position: usize,
}

/// Why a single age-restricted video could not be recovered.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("yt-dlp could not be started: {0}")]
    Extractor(#[source] ImportError),

    #[error("yt-dlp reported an error: {0}")]
    Reported(String),

    #[error("yt-dlp printed no metadata")]
    Empty,

    #[error(transparent)]
    Malformed(ImportError),

    #[error(transparent)]
    MissingField(#[from] MissingFieldError),
}

/// Failure attached to the video it belongs to.
#[derive(Debug)]
pub struct FailedRecovery {
    pub video_id: VideoId,
    pub error: RecoveryError,
}

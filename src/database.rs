//! Locating and appending to FreeTube's `playlists.db`.
//!
//! The database is a newline-delimited JSON file owned by FreeTube. This tool
//! never creates it: a missing file almost always means FreeTube is installed
//! somewhere else, and creating one would silently hide the playlist.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ImportError, ImportResult};
use crate::playlist::PlaylistRecord;

pub const DATABASE_FILE: &str = "playlists.db";
const APP_DIR: &str = "FreeTube";
/// Config location of the Flatpak build, relative to the home directory.
const FLATPAK_DIR: &str = ".var/app/io.freetubeapp.FreeTube/config/FreeTube";

/// Where `playlists.db` lives when the user did not say otherwise.
pub fn default_database_path() -> Option<PathBuf> {
    data_dir_from(dirs::home_dir().as_deref(), dirs::config_dir().as_deref())
        .map(|dir| dir.join(DATABASE_FILE))
}

/// `config_dir` is `~/.config` on Linux, `~/Library/Application Support` on
/// macOS and `%APPDATA%` on Windows, which is exactly where FreeTube keeps
/// its data. Flatpak installs on Linux win when their directory exists.
fn data_dir_from(home: Option<&Path>, config_dir: Option<&Path>) -> Option<PathBuf> {
    if cfg!(target_os = "linux")
        && let Some(home) = home
    {
        let flatpak = home.join(FLATPAK_DIR);
        if flatpak.is_dir() {
            return Some(flatpak);
        }
    }
    config_dir.map(|dir| dir.join(APP_DIR))
}

/// A user-supplied path may point at the file itself or at its directory.
pub fn resolve_override(path: &Path) -> PathBuf {
    if path.file_name().is_some_and(|name| name == DATABASE_FILE) {
        path.to_path_buf()
    } else {
        path.join(DATABASE_FILE)
    }
}

pub fn resolve_database_path(override_path: Option<&Path>) -> Option<PathBuf> {
    match override_path {
        Some(path) => Some(resolve_override(path)),
        None => default_database_path(),
    }
}

/// Appends the playlist as one JSON line. The file must already exist.
pub fn append_playlist(path: &Path, playlist: &PlaylistRecord) -> ImportResult<()> {
    if !path.is_file() {
        return Err(ImportError::DatabaseNotFound(path.to_path_buf()));
    }

    let json = serde_json::to_string(playlist).map_err(ImportError::Serialize)?;
    let io_error = |source| ImportError::Database {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;

    let mut payload = String::with_capacity(json.len() + 2);
    if !ends_with_newline(&mut file).map_err(io_error)? {
        payload.push('\n');
    }
    payload.push_str(&json);
    payload.push('\n');

    file.write_all(payload.as_bytes()).map_err(io_error)?;
    file.flush().map_err(io_error)?;
    debug!(path = %path.display(), bytes = payload.len(), "playlist appended");
    Ok(())
}

/// Empty files count as ending with a newline.
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

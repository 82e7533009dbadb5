#![forbid(unsafe_code)]

//! Building blocks for `ytftpl`, which turns a YouTube playlist into a
//! FreeTube `playlists.db` entry by reading `yt-dlp` output.
//!
//! The binary in `src/bin/ytftpl.rs` only wires these modules together; every
//! piece of parsing and record building lives here so it can be tested without
//! spawning processes.

pub mod classify;
pub mod config;
pub mod database;
pub mod error;
pub mod extractor;
pub mod fragments;
pub mod pipeline;
pub mod playlist;
pub mod record;
pub mod recovery;
pub mod report;
pub mod security;
pub mod video_id;

#![forbid(unsafe_code)]

//! Guard against writing another user's FreeTube data as root.

use anyhow::Result;

/// FreeTube's database lives in the desktop user's home. Under root (or plain
/// `sudo`) the default path resolves to root's home instead, and any file we
/// touched there would end up owned by root, so refuse early.
#[cfg(unix)]
pub fn ensure_not_root(process: &str) -> Result<()> {
    ensure_not_root_for(nix::unistd::Uid::current(), process)
}

#[cfg(not(unix))]
pub fn ensure_not_root(_process: &str) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn ensure_not_root_for(uid: nix::unistd::Uid, process: &str) -> Result<()> {
    if uid.is_root() {
        anyhow::bail!(
            "{process} must not be run as root; run it as the user that owns the FreeTube profile"
        );
    }
    Ok(())
}

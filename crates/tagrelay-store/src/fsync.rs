//! Durability helpers.
//!
//! A record is only considered queued once both its bytes and the directory
//! entry of the file holding it have reached the medium. Renames and
//! deletes likewise only survive power loss after the directory is synced.

use std::fs::File;
use std::io;
use std::path::Path;

/// Flushes a file's contents and metadata to the medium.
pub fn sync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Flushes a directory so that creates, renames and deletes inside it are
/// durable.
///
/// Directories cannot be opened as files on every platform; where they
/// cannot, this is a no-op.
#[cfg(unix)]
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

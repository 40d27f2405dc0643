//! Snapshot of the server configuration before it is overwritten.
//!
//! A snapshot is a plain recursive copy into
//! `<home>/<backup dir>/<YYYYMMDDHHMM>`. It exists for the operator; the pipeline
//! never reads it back, and a failed copy is not cleaned up.

use crate::console::{ask_confirmation, Confirmation, Console, Message};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Operator declined to continue without a backup")]
    Declined,

    #[error("Failed to copy {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a successful snapshot step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    /// Configuration copied to this directory
    Created(PathBuf),
    /// Source was missing and the operator chose to go on without a backup
    Skipped,
}

/// Takes snapshots of a directory tree
pub trait BackupManager {
    fn snapshot(
        &self,
        source: &Path,
        home: &Path,
        console: &mut dyn Console,
    ) -> Result<Snapshot, BackupError>;
}

/// Copies snapshots into a directory under the operator's home
#[derive(Debug, Clone)]
pub struct FsBackup {
    dir_name: String,
}

impl FsBackup {
    pub fn new(dir_name: impl Into<String>) -> Self {
        Self {
            dir_name: dir_name.into(),
        }
    }

    /// Minute-granularity destination; two runs in the same minute share it.
    pub fn destination_for(&self, home: &Path, at: DateTime<Local>) -> PathBuf {
        home.join(&self.dir_name)
            .join(at.format("%Y%m%d%H%M").to_string())
    }
}

impl BackupManager for FsBackup {
    fn snapshot(
        &self,
        source: &Path,
        home: &Path,
        console: &mut dyn Console,
    ) -> Result<Snapshot, BackupError> {
        if !source.is_dir() {
            warn!("Backup source {:?} does not exist", source);
            console.print(Message::error(format!(
                "nginx configuration does not exist at path {}!",
                source.display()
            )));

            return match ask_confirmation(
                console,
                "Do you want to continue without backing up the file(s)?",
            ) {
                Confirmation::Yes => {
                    info!("Operator chose to continue without a backup");
                    Ok(Snapshot::Skipped)
                }
                Confirmation::No | Confirmation::Cancel => Err(BackupError::Declined),
            };
        }

        let destination = self.destination_for(home, Local::now());
        console.print(Message::info(format!(
            "Backing up {} to {}...",
            source.display(),
            destination.display()
        )));

        copy_tree(source, &destination)?;

        info!("Backed up {:?} to {:?}", source, destination);
        console.print(Message::done(format!(
            "nginx configuration backed up to {}!",
            destination.display()
        )));
        Ok(Snapshot::Created(destination))
    }
}

/// Recursively copy `source` into `destination`, overwriting same-named files.
/// Symlinks are recreated as symlinks (`sites-enabled` is mostly links).
pub fn copy_tree(source: &Path, destination: &Path) -> Result<(), BackupError> {
    fs::create_dir_all(destination).map_err(io_err(destination))?;

    for entry in fs::read_dir(source).map_err(io_err(source))? {
        let entry = entry.map_err(io_err(source))?;
        let path = entry.path();
        let target = destination.join(entry.file_name());
        let file_type = entry.file_type().map_err(io_err(&path))?;

        if file_type.is_dir() {
            copy_tree(&path, &target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(&path).map_err(io_err(&path))?;
            if target.symlink_metadata().is_ok() {
                fs::remove_file(&target).map_err(io_err(&target))?;
            }
            std::os::unix::fs::symlink(&link, &target).map_err(io_err(&target))?;
        } else {
            fs::copy(&path, &target).map_err(io_err(&path))?;
        }
        debug!("Copied {:?}", path);
    }

    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BackupError {
    let path = path.to_path_buf();
    move |source| BackupError::Io { path, source }
}

//! ROM library consistency engine for romtender
//!
//! Keeps a ROM file and its companions (artwork, save files, collection
//! entries and the play-tracker database) in step across rename, archive,
//! restore and delete. Companion updates are best-effort: they are logged
//! and reported, never rolled back.

pub mod art;
pub mod collection;
pub mod paths;
pub mod relocate;
pub mod rom;
pub mod thumbnails;
pub mod tracker;

pub use art::{ArtCategory, find_art, find_existing_art};
pub use collection::{Collection, CollectionStore};
pub use relocate::{
    ActionOutcome, ArchiveDeletion, CompanionKind, CompanionReport, CompanionStatus, Relocator,
    RomAction, delete_archive,
};
pub use rom::{LibraryLayout, RomDirectory, RomItem, list_archives, scan_directory};
pub use thumbnails::{LocalThumbnailMirror, ThumbnailSource};
pub use tracker::{PlayTracker, TrackerRecord};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No play-tracker record for {0}")]
    TrackerRecordNotFound(String),

    #[error("Malformed collection file {path} (line {line}): {reason}")]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{path} is not under {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Destination already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

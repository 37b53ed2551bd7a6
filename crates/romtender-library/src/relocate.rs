//! ROM relocation: rename, archive, restore, delete and nuke
//!
//! The primary file operation decides success. Companion updates (artwork,
//! disc index files, save files, play-tracker rows) run afterwards, each on
//! its own; a failed companion is logged and recorded in the returned
//! [`CompanionReport`] but never undoes the primary move.

use crate::LibraryError;
use crate::art::find_existing_art;
use crate::paths::{MEDIA_DIR, build_archive_path, build_restore_path, tracker_key};
use crate::rom::{LibraryLayout, RomDirectory, RomItem, strip_extension};
use crate::tracker::PlayTracker;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Deepest directory level `delete_archive` will look into
pub const MAX_ARCHIVE_DEPTH: usize = 10;

/// Blocker reported when an archive nests deeper than [`MAX_ARCHIVE_DEPTH`]
pub const MAX_DEPTH_EXCEEDED: &str = "Max Depth Exceeded";

const DISC_INDEX_EXTENSIONS: [&str; 2] = ["cue", "m3u"];

/// Something kept in step with a ROM besides the ROM itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionKind {
    Art,
    DiscIndex,
    SaveFile,
    Tracker,
}

impl fmt::Display for CompanionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompanionKind::Art => "art",
            CompanionKind::DiscIndex => "disc index",
            CompanionKind::SaveFile => "save file",
            CompanionKind::Tracker => "play tracker",
        };
        f.write_str(name)
    }
}

/// What happened to one companion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanionStatus {
    Done,
    /// Nothing to update (no art, untracked ROM, no save)
    Skipped,
    Failed(String),
}

/// Per-companion results of a relocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanionReport {
    entries: Vec<(CompanionKind, CompanionStatus)>,
}

impl CompanionReport {
    pub fn record(&mut self, kind: CompanionKind, status: CompanionStatus) {
        if let CompanionStatus::Failed(reason) = &status {
            warn!("Failed to update {}: {}", kind, reason);
        }
        self.entries.push((kind, status));
    }

    fn record_result(&mut self, kind: CompanionKind, result: Result<(), LibraryError>) {
        match result {
            Ok(()) => self.record(kind, CompanionStatus::Done),
            Err(e) => self.record(kind, CompanionStatus::Failed(e.to_string())),
        }
    }

    pub fn entries(&self) -> &[(CompanionKind, CompanionStatus)] {
        &self.entries
    }

    /// Statuses recorded for one kind of companion, in order
    pub fn statuses(&self, kind: CompanionKind) -> Vec<&CompanionStatus> {
        self.entries
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, s)| s)
            .collect()
    }

    pub fn succeeded(&self, kind: CompanionKind) -> bool {
        self.statuses(kind).contains(&&CompanionStatus::Done)
    }

    pub fn failures(&self) -> Vec<(CompanionKind, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, s)| match s {
                CompanionStatus::Failed(reason) => Some((*k, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures().is_empty()
    }
}

/// The relocation operations the library exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RomAction {
    Rename { new_name: String },
    Archive { archive_name: String },
    Restore { archive: RomDirectory },
    Delete,
    Nuke,
}

/// Result of a successful primary operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Where the ROM now lives; `None` once deleted
    pub path: Option<PathBuf>,
    pub companions: CompanionReport,
}

impl ActionOutcome {
    /// On-disk file name of the relocated ROM
    pub fn filename(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
    }
}

/// Outcome of [`delete_archive`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveDeletion {
    Removed,
    /// Not deleted; carries the first file found or [`MAX_DEPTH_EXCEEDED`]
    Blocked(String),
}

/// Applies [`RomAction`]s against a library layout
pub struct Relocator<'a> {
    layout: &'a LibraryLayout,
    tracker: PlayTracker,
}

impl<'a> Relocator<'a> {
    pub fn new(layout: &'a LibraryLayout) -> Self {
        Self {
            layout,
            tracker: PlayTracker::new(&layout.tracker_db),
        }
    }

    /// Run one action against a ROM in `rom_dir`
    pub fn apply(
        &self,
        action: &RomAction,
        item: &RomItem,
        rom_dir: &RomDirectory,
    ) -> Result<ActionOutcome, LibraryError> {
        match action {
            RomAction::Rename { new_name } => self.rename(item, new_name, rom_dir),
            RomAction::Archive { archive_name } => self.archive(item, rom_dir, archive_name),
            RomAction::Restore { archive } => self.restore(item, rom_dir, archive),
            RomAction::Delete => self.delete(item, rom_dir),
            RomAction::Nuke => self.nuke(item, rom_dir),
        }
    }

    /// Move a ROM into the named archive, mirroring its folder structure
    pub fn archive(
        &self,
        item: &RomItem,
        rom_dir: &RomDirectory,
        archive_name: &str,
    ) -> Result<ActionOutcome, LibraryError> {
        let dest = build_archive_path(&self.layout.rom_root, &item.filename, rom_dir, archive_name)?;
        move_path(&item.path, &dest)?;
        info!("Archived {} to {}", item.filename, dest.display());

        let mut companions = CompanionReport::default();
        self.carry_art(item, rom_dir, &dest, &mut companions);

        Ok(ActionOutcome {
            path: Some(dest),
            companions,
        })
    }

    /// Move an archived ROM back to its place in the active tree
    pub fn restore(
        &self,
        item: &RomItem,
        rom_dir: &RomDirectory,
        archive: &RomDirectory,
    ) -> Result<ActionOutcome, LibraryError> {
        let dest = build_restore_path(&self.layout.rom_root, &item.filename, rom_dir, archive)?;
        move_path(&item.path, &dest)?;
        info!("Restored {} to {}", item.filename, dest.display());

        let mut companions = CompanionReport::default();
        self.carry_art(item, rom_dir, &dest, &mut companions);

        Ok(ActionOutcome {
            path: Some(dest),
            companions,
        })
    }

    /// Rename a ROM, keeping its extension, and bring its companions along
    pub fn rename(
        &self,
        item: &RomItem,
        new_base_name: &str,
        rom_dir: &RomDirectory,
    ) -> Result<ActionOutcome, LibraryError> {
        let old_base = item.base_name();
        let new_filename = match item.extension() {
            Some(ext) => format!("{}.{}", new_base_name, ext),
            None => new_base_name.to_string(),
        };

        if new_filename == item.filename {
            debug!("Rename of {} is a no-op", item.filename);
            return Ok(ActionOutcome {
                path: Some(item.path.clone()),
                companions: CompanionReport::default(),
            });
        }

        let dest = rom_dir.join(&new_filename);
        move_path(&item.path, &dest)?;
        info!("Renamed {} to {}", item.filename, new_filename);

        let mut companions = CompanionReport::default();
        self.rename_disc_indexes(item, &old_base, new_base_name, rom_dir, &dest, &mut companions);
        self.migrate_tracker(item, &dest, new_base_name, &mut companions);
        self.rename_saves(item, &old_base, new_base_name, &new_filename, &mut companions);
        self.rename_art(item, new_base_name, rom_dir, &mut companions);

        Ok(ActionOutcome {
            path: Some(dest),
            companions,
        })
    }

    /// Delete a ROM, then its art
    pub fn delete(&self, item: &RomItem, rom_dir: &RomDirectory) -> Result<ActionOutcome, LibraryError> {
        let art = find_existing_art(item, rom_dir);

        if item.is_directory {
            fs::remove_dir_all(&item.path)?;
        } else {
            fs::remove_file(&item.path)?;
        }
        info!("Deleted {}", item.path.display());

        let mut companions = CompanionReport::default();
        match art {
            Some(art) => {
                companions.record_result(CompanionKind::Art, fs::remove_file(&art).map_err(Into::into))
            }
            None => companions.record(CompanionKind::Art, CompanionStatus::Skipped),
        }

        Ok(ActionOutcome {
            path: None,
            companions,
        })
    }

    /// Clear a ROM's play data, then delete it
    ///
    /// The delete runs whatever happened to the tracker.
    pub fn nuke(&self, item: &RomItem, rom_dir: &RomDirectory) -> Result<ActionOutcome, LibraryError> {
        let key = tracker_key(&self.layout.rom_root, &item.path);
        let tracker_status = match self.tracker.clear(&key) {
            Ok(()) => CompanionStatus::Done,
            Err(LibraryError::TrackerRecordNotFound(_)) => CompanionStatus::Skipped,
            Err(e) => CompanionStatus::Failed(e.to_string()),
        };

        let mut outcome = self.delete(item, rom_dir)?;
        let mut companions = CompanionReport::default();
        companions.record(CompanionKind::Tracker, tracker_status);
        companions.entries.append(&mut outcome.companions.entries);
        outcome.companions = companions;

        Ok(outcome)
    }

    fn carry_art(
        &self,
        item: &RomItem,
        rom_dir: &RomDirectory,
        dest: &Path,
        companions: &mut CompanionReport,
    ) {
        let Some(art) = find_existing_art(item, rom_dir) else {
            companions.record(CompanionKind::Art, CompanionStatus::Skipped);
            return;
        };

        let result = match (dest.parent(), art.file_name()) {
            (Some(parent), Some(name)) => move_path(&art, &parent.join(MEDIA_DIR).join(name)),
            _ => Err(LibraryError::PathNotFound(dest.to_path_buf())),
        };
        companions.record_result(CompanionKind::Art, result);
    }

    fn rename_disc_indexes(
        &self,
        item: &RomItem,
        old_base: &str,
        new_base: &str,
        rom_dir: &RomDirectory,
        dest: &Path,
        companions: &mut CompanionReport,
    ) {
        let mut pairs: Vec<(PathBuf, PathBuf)> = DISC_INDEX_EXTENSIONS
            .iter()
            .map(|ext| {
                (
                    rom_dir.join(&format!("{}.{}", old_base, ext)),
                    rom_dir.join(&format!("{}.{}", new_base, ext)),
                )
            })
            .collect();

        if item.is_multi_disc_directory {
            pairs.push((
                dest.join(format!("{}.m3u", old_base)),
                dest.join(format!("{}.m3u", new_base)),
            ));
        }

        let mut touched = false;
        for (from, to) in pairs {
            if from == item.path || !from.is_file() {
                continue;
            }
            touched = true;
            companions.record_result(CompanionKind::DiscIndex, move_path(&from, &to));
        }

        if !touched {
            companions.record(CompanionKind::DiscIndex, CompanionStatus::Skipped);
        }
    }

    fn migrate_tracker(
        &self,
        item: &RomItem,
        dest: &Path,
        new_name: &str,
        companions: &mut CompanionReport,
    ) {
        let old_key = tracker_key(&self.layout.rom_root, &item.path);
        let new_key = tracker_key(&self.layout.rom_root, dest);

        let status = match self.tracker.migrate(&old_key, &new_key, new_name) {
            Ok(()) => CompanionStatus::Done,
            Err(LibraryError::TrackerRecordNotFound(_)) => {
                debug!("{} has no play data to migrate", old_key);
                CompanionStatus::Skipped
            }
            Err(e) => CompanionStatus::Failed(e.to_string()),
        };
        companions.record(CompanionKind::Tracker, status);
    }

    fn rename_saves(
        &self,
        item: &RomItem,
        old_base: &str,
        new_base: &str,
        new_filename: &str,
        companions: &mut CompanionReport,
    ) {
        if item.tag.is_empty() {
            companions.record(CompanionKind::SaveFile, CompanionStatus::Skipped);
            return;
        }

        let save_dir = self.layout.saves_root.join(&item.tag);
        let saves = match find_saves(&save_dir, &item.filename, old_base) {
            Ok(saves) => saves,
            Err(e) => {
                debug!("No saves readable in {}: {}", save_dir.display(), e);
                Vec::new()
            }
        };

        if saves.is_empty() {
            companions.record(CompanionKind::SaveFile, CompanionStatus::Skipped);
            return;
        }

        for save in saves {
            let stem = save
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let new_stem = if stem == item.filename { new_filename } else { new_base };
            let target = match save.extension() {
                Some(ext) => save_dir.join(format!("{}.{}", new_stem, ext.to_string_lossy())),
                None => save_dir.join(new_stem),
            };
            companions.record_result(CompanionKind::SaveFile, move_path(&save, &target));
        }
    }

    fn rename_art(
        &self,
        item: &RomItem,
        new_base: &str,
        rom_dir: &RomDirectory,
        companions: &mut CompanionReport,
    ) {
        let Some(art) = find_existing_art(item, rom_dir) else {
            companions.record(CompanionKind::Art, CompanionStatus::Skipped);
            return;
        };

        let target = match art.extension() {
            Some(ext) => rom_dir
                .media_dir()
                .join(format!("{}.{}", new_base, ext.to_string_lossy())),
            None => rom_dir.media_dir().join(new_base),
        };
        companions.record_result(CompanionKind::Art, move_path(&art, &target));
    }
}

/// Saves in `save_dir` named after the ROM file or its base name
fn find_saves(save_dir: &Path, filename: &str, base: &str) -> Result<Vec<PathBuf>, LibraryError> {
    let mut saves = Vec::new();

    for entry in fs::read_dir(save_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = strip_extension(&name);
        if stem == filename || stem == base {
            saves.push(path);
        }
    }

    saves.sort();
    Ok(saves)
}

/// Rename `from` to `to`, creating parents and refusing to overwrite
fn move_path(from: &Path, to: &Path) -> Result<(), LibraryError> {
    if to.exists() {
        return Err(LibraryError::AlreadyExists(to.to_path_buf()));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::rename(from, to)?;
    debug!("Moved {} -> {}", from.display(), to.display());
    Ok(())
}

/// Remove an archive tree if it holds no files
///
/// Walks at most [`MAX_ARCHIVE_DEPTH`] levels, in name order. The first
/// file found blocks the deletion and is returned; so does nesting deeper
/// than the limit. Symlinks are not followed and count as files.
pub fn delete_archive(archive: &RomDirectory) -> Result<ArchiveDeletion, LibraryError> {
    let walker = WalkDir::new(&archive.path)
        .follow_links(false)
        .max_depth(MAX_ARCHIVE_DEPTH + 1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if entry.depth() == 0 {
            continue;
        }

        if entry.file_type().is_dir() {
            if entry.depth() > MAX_ARCHIVE_DEPTH {
                warn!("Archive {} nests too deep to delete", archive.display_name);
                return Ok(ArchiveDeletion::Blocked(MAX_DEPTH_EXCEEDED.to_string()));
            }
        } else {
            let name = entry.file_name().to_string_lossy().to_string();
            debug!("Archive {} still holds {}", archive.display_name, name);
            return Ok(ArchiveDeletion::Blocked(name));
        }
    }

    fs::remove_dir_all(&archive.path)?;
    info!("Deleted archive {}", archive.display_name);
    Ok(ArchiveDeletion::Removed)
}

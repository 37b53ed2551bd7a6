//! Path arithmetic for archives, restores and tracker keys
//!
//! Everything here is pure: no function touches the filesystem.
//!
//! An archive is a dot-prefixed folder under the ROM root that mirrors the
//! active tree below it, so a ROM at `<root>/GBA/Hacks/x.gba` archived into
//! `.Archive` lands at `<root>/.Archive/GBA/Hacks/x.gba`, and restoring it
//! strips the archive root back off.

use crate::LibraryError;
use crate::rom::RomDirectory;
use std::path::{Component, Path, PathBuf};

/// Prefix that marks a folder under the ROM root as an archive
pub const ARCHIVE_PREFIX: &str = ".";

/// Name of the per-directory artwork folder
pub const MEDIA_DIR: &str = ".media";

/// Normalize an archive name so it starts with the archive prefix
pub fn prep_archive_name(name: &str) -> String {
    if name.starts_with(ARCHIVE_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", ARCHIVE_PREFIX, name)
    }
}

/// Archive name for display: the leading prefix removed
///
/// Only ever used for labels; on-disk paths keep the prefix.
pub fn clean_archive_name(name: &str) -> String {
    name.strip_prefix(ARCHIVE_PREFIX).unwrap_or(name).to_string()
}

/// Root folder of the named archive
pub fn archive_root(rom_root: &Path, archive_name: &str) -> PathBuf {
    rom_root.join(prep_archive_name(archive_name))
}

/// `path` relative to `root`, or `OutsideRoot` if it does not live below it
pub fn relative_to(path: &Path, root: &Path) -> Result<PathBuf, LibraryError> {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| LibraryError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
}

/// Destination of `filename` from `rom_dir` when moved into an archive
pub fn build_archive_path(
    rom_root: &Path,
    filename: &str,
    rom_dir: &RomDirectory,
    archive_name: &str,
) -> Result<PathBuf, LibraryError> {
    let relative = relative_to(&rom_dir.path, rom_root)?;
    Ok(archive_root(rom_root, archive_name)
        .join(relative)
        .join(filename))
}

/// Destination of `filename` from an archived `rom_dir` when restored
///
/// Exact inverse of [`build_archive_path`] for directories under `archive`.
pub fn build_restore_path(
    rom_root: &Path,
    filename: &str,
    rom_dir: &RomDirectory,
    archive: &RomDirectory,
) -> Result<PathBuf, LibraryError> {
    let relative = relative_to(&rom_dir.path, &archive.path)?;
    Ok(rom_root.join(relative).join(filename))
}

/// Play-tracker key for a ROM: root-relative, no leading separator, `/`-joined
pub fn tracker_key(rom_root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(rom_root).unwrap_or(path);

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

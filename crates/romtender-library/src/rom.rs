//! ROM items, ROM directories and directory scanning

use crate::LibraryError;
use crate::paths::{ARCHIVE_PREFIX, MEDIA_DIR, clean_archive_name};
use romtender_config::PathsConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the engine's persistent state lives on disk
///
/// Passed explicitly to every store and to the relocator; nothing in this
/// crate reads process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    /// Root of the active ROM tree (platform folders live directly below it)
    pub rom_root: PathBuf,
    /// Root of the save directories, one `<tag>` folder per platform
    pub saves_root: PathBuf,
    /// Directory holding one `<DisplayName>.txt` file per collection
    pub collections_dir: PathBuf,
    /// The play-tracker SQLite database
    pub tracker_db: PathBuf,
}

impl From<&PathsConfig> for LibraryLayout {
    fn from(paths: &PathsConfig) -> Self {
        Self {
            rom_root: paths.rom_root.clone(),
            saves_root: paths.saves_root.clone(),
            collections_dir: paths.collections_dir.clone(),
            tracker_db: paths.tracker_db.clone(),
        }
    }
}

/// A single ROM as seen on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomItem {
    pub filename: String,
    pub display_name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub is_multi_disc_directory: bool,
    pub tag: String,
}

impl RomItem {
    /// Build an item for a plain ROM file
    pub fn file(path: impl Into<PathBuf>, tag: &str) -> Self {
        let path = path.into();
        let filename = file_name_of(&path);

        Self {
            display_name: strip_extension(&filename),
            filename,
            path,
            is_directory: false,
            is_multi_disc_directory: false,
            tag: tag.to_string(),
        }
    }

    /// Build an item for a directory entry
    ///
    /// A directory is multi-disc when it holds a playlist named after itself.
    pub fn directory(path: impl Into<PathBuf>, tag: &str) -> Self {
        let path = path.into();
        let filename = file_name_of(&path);
        let is_multi_disc_directory = path.join(format!("{}.m3u", filename)).is_file();

        Self {
            display_name: filename.clone(),
            filename,
            path,
            is_directory: true,
            is_multi_disc_directory,
            tag: tag.to_string(),
        }
    }

    /// Override the derived display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// File name without its extension (directories keep their full name)
    pub fn base_name(&self) -> String {
        if self.is_directory {
            self.filename.clone()
        } else {
            strip_extension(&self.filename)
        }
    }

    /// Extension of the on-disk file name, without the dot
    pub fn extension(&self) -> Option<String> {
        if self.is_directory {
            return None;
        }
        Path::new(&self.filename)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
    }
}

/// A platform folder, a collection root or an archive root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomDirectory {
    pub display_name: String,
    pub tag: String,
    pub path: PathBuf,
}

impl RomDirectory {
    /// Describe a directory, deriving tag and display name from its folder name
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = file_name_of(&path);
        let tag = extract_tag(&name).unwrap_or_default();

        let display_name = if name.starts_with(ARCHIVE_PREFIX) {
            clean_archive_name(&name)
        } else {
            name
        };

        Self {
            display_name,
            tag,
            path,
        }
    }

    /// Full path of an entry inside this directory
    pub fn join(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }

    /// The `.media` directory colocated with this directory's ROMs
    pub fn media_dir(&self) -> PathBuf {
        self.path.join(MEDIA_DIR)
    }
}

/// Strip the last extension from a file name
pub fn strip_extension(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string())
}

/// Extract the platform tag from a folder name like `Game Boy Advance (GBA)`
pub fn extract_tag(folder_name: &str) -> Option<String> {
    let trimmed = folder_name.trim_end();
    let inner = trimmed.strip_suffix(')')?;
    let start = inner.rfind('(')?;
    let tag = inner[start + 1..].trim();

    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// List the ROMs directly inside a directory
///
/// Hidden entries (including `.media` and archives) are skipped. Entries
/// are returned sorted case-insensitively by file name.
pub fn scan_directory(dir: &RomDirectory) -> Result<Vec<RomItem>, LibraryError> {
    if !dir.path.is_dir() {
        return Err(LibraryError::PathNotFound(dir.path.clone()));
    }

    let mut items = Vec::new();

    for entry in fs::read_dir(&dir.path)? {
        let entry = entry?;
        let entry_path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with('.') {
            continue;
        }

        if entry_path.is_dir() {
            items.push(RomItem::directory(entry_path, &dir.tag));
        } else if entry_path.is_file() {
            items.push(RomItem::file(entry_path, &dir.tag));
        }
    }

    items.sort_by_key(|item| item.filename.to_lowercase());
    Ok(items)
}

/// List the archive roots (dot-prefixed folders) under the ROM root
///
/// An empty list is not an error; a missing ROM root is.
pub fn list_archives(rom_root: &Path) -> Result<Vec<RomDirectory>, LibraryError> {
    if !rom_root.is_dir() {
        return Err(LibraryError::PathNotFound(rom_root.to_path_buf()));
    }

    let mut archives = Vec::new();

    for entry in fs::read_dir(rom_root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with(ARCHIVE_PREFIX) && name != MEDIA_DIR && entry.path().is_dir() {
            archives.push(RomDirectory::new(entry.path()));
        }
    }

    archives.sort_by_key(|a| a.display_name.to_lowercase());
    Ok(archives)
}

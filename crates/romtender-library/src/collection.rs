//! Collection files
//!
//! A collection is a plain UTF-8 text file named `<DisplayName>.txt` holding
//! one ROM path per line. Line order is display order. Paths under the live
//! ROM root are written with the portable `/Roms/` prefix so a collection
//! stays valid on a device whose SD card mounts somewhere else.

use crate::LibraryError;
use crate::rom::{LibraryLayout, RomDirectory, RomItem, extract_tag, strip_extension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Portable prefix standing in for the ROM root inside collection files
pub const ROM_ROOT_ALIAS: &str = "/Roms";

const COLLECTION_EXTENSION: &str = "txt";

/// A named, ordered list of ROMs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub display_name: String,
    pub file: PathBuf,
    pub games: Vec<RomItem>,
}

impl Collection {
    /// An empty collection backed by `<collections_dir>/<name>.txt`
    pub fn new(display_name: &str, collections_dir: &Path) -> Self {
        Self {
            display_name: display_name.to_string(),
            file: collections_dir.join(format!("{}.{}", display_name, COLLECTION_EXTENSION)),
            games: Vec::new(),
        }
    }
}

/// Reads and writes collection files
pub struct CollectionStore {
    collections_dir: PathBuf,
    rom_root: PathBuf,
}

impl CollectionStore {
    pub fn new(layout: &LibraryLayout) -> Self {
        Self {
            collections_dir: layout.collections_dir.clone(),
            rom_root: layout.rom_root.clone(),
        }
    }

    /// Collections on disk, optionally narrowed to names containing `filter`
    ///
    /// A missing collections directory simply has no collections.
    pub fn generate_list(&self, filter: Option<&str>) -> Result<Vec<RomDirectory>, LibraryError> {
        if !self.collections_dir.is_dir() {
            return Ok(Vec::new());
        }

        let filter = filter.map(str::to_lowercase);
        let mut collections = Vec::new();

        for entry in fs::read_dir(&self.collections_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if name.starts_with('.') || !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(COLLECTION_EXTENSION) {
                continue;
            }

            let display_name = strip_extension(&name);
            if let Some(filter) = &filter
                && !display_name.to_lowercase().contains(filter)
            {
                continue;
            }

            collections.push(RomDirectory {
                display_name,
                tag: String::new(),
                path,
            });
        }

        collections.sort_by_key(|c| c.display_name.to_lowercase());
        Ok(collections)
    }

    /// Load a collection from its backing file
    pub fn read(&self, file: &Path) -> Result<Collection, LibraryError> {
        let bytes = fs::read(file)?;
        let contents = String::from_utf8(bytes).map_err(|e| LibraryError::Format {
            path: file.to_path_buf(),
            line: 0,
            reason: e.to_string(),
        })?;

        let mut games = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            games.push(parse_line(file, index + 1, line)?);
        }

        let display_name = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        debug!("Read {} games from {}", games.len(), file.display());

        Ok(Collection {
            display_name,
            file: file.to_path_buf(),
            games,
        })
    }

    /// Write a collection in its in-memory order
    ///
    /// Reordering a collection is done by reordering `games` and saving.
    pub fn save(&self, collection: &Collection) -> Result<(), LibraryError> {
        if let Some(parent) = collection.file.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut contents = String::new();
        for game in &collection.games {
            contents.push_str(&self.to_line(game));
            contents.push('\n');
        }

        fs::write(&collection.file, contents)?;
        info!(
            "Saved collection {} ({} games)",
            collection.display_name,
            collection.games.len()
        );
        Ok(())
    }

    /// Append games to a collection, merging with what is already on disk
    ///
    /// A game is skipped when any stored path contains its display name,
    /// ignoring case. This is a loose containment test: "Mario" is treated
    /// as present once "Super Mario Bros" is stored. Returns the number of
    /// games added.
    pub fn add_games(
        &self,
        collection: &mut Collection,
        games: &[RomItem],
    ) -> Result<usize, LibraryError> {
        if collection.file.is_file() {
            collection.games = self.read(&collection.file)?.games;
        }

        let mut added = 0;
        for game in games {
            let needle = game.display_name.to_lowercase();
            let present = collection
                .games
                .iter()
                .any(|g| g.path.to_string_lossy().to_lowercase().contains(&needle));

            if present {
                debug!("{} already in {}", game.display_name, collection.display_name);
                continue;
            }

            collection.games.push(game.clone());
            added += 1;
        }

        self.save(collection)?;
        Ok(added)
    }

    /// Remove a collection's backing file
    pub fn delete(&self, collection: &Collection) -> Result<(), LibraryError> {
        fs::remove_file(&collection.file)?;
        info!("Deleted collection {}", collection.display_name);
        Ok(())
    }

    /// The line written for a game
    pub fn to_line(&self, game: &RomItem) -> String {
        let path = if game.is_multi_disc_directory {
            game.path.join(format!("{}.m3u", game.display_name))
        } else {
            game.path.clone()
        };

        let path = path.to_string_lossy();
        let root = self.rom_root.to_string_lossy();
        let root = root.trim_end_matches('/');

        match path.strip_prefix(root) {
            Some(rest) if rest.starts_with('/') => format!("{}{}", ROM_ROOT_ALIAS, rest),
            _ => path.to_string(),
        }
    }
}

fn parse_line(file: &Path, line_number: usize, line: &str) -> Result<RomItem, LibraryError> {
    let path = Path::new(line);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| LibraryError::Format {
            path: file.to_path_buf(),
            line: line_number,
            reason: format!("no file name in {:?}", line),
        })?;

    let tag = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| extract_tag(&n.to_string_lossy()))
        .unwrap_or_default();

    Ok(RomItem {
        display_name: strip_extension(&filename),
        filename,
        path: PathBuf::from(line),
        is_directory: false,
        is_multi_disc_directory: false,
        tag,
    })
}

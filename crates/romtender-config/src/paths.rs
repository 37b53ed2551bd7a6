//! Filesystem locations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the ROM library and its side stores live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the active ROM tree
    #[serde(default = "default_rom_root")]
    pub rom_root: PathBuf,

    /// Root of the per-platform save folders
    #[serde(default = "default_saves_root")]
    pub saves_root: PathBuf,

    /// Folder holding collection text files
    #[serde(default = "default_collections_dir")]
    pub collections_dir: PathBuf,

    /// Play-tracker SQLite database
    #[serde(default = "default_tracker_db")]
    pub tracker_db: PathBuf,
}

fn default_rom_root() -> PathBuf {
    PathBuf::from("/mnt/SDCARD/Roms")
}

fn default_saves_root() -> PathBuf {
    PathBuf::from("/mnt/SDCARD/Saves")
}

fn default_collections_dir() -> PathBuf {
    PathBuf::from("/mnt/SDCARD/Collections")
}

fn default_tracker_db() -> PathBuf {
    PathBuf::from("/mnt/SDCARD/.userdata/shared/game_logs.sqlite")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            rom_root: default_rom_root(),
            saves_root: default_saves_root(),
            collections_dir: default_collections_dir(),
            tracker_db: default_tracker_db(),
        }
    }
}

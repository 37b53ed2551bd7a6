//! Artwork settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Kind of artwork fetched from the thumbnail repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArtCategory {
    /// Front box art
    #[default]
    BoxArt,
    /// In-game screenshot
    Snap,
    /// Title screen capture
    TitleScreen,
    /// Logo / wheel image
    Logo,
}

impl ArtCategory {
    /// Folder holding this category inside a repository system folder
    pub fn repository_dir(&self) -> &'static str {
        match self {
            ArtCategory::BoxArt => "Named_Boxarts",
            ArtCategory::Snap => "Named_Snaps",
            ArtCategory::TitleScreen => "Named_Titles",
            ArtCategory::Logo => "Named_Logos",
        }
    }
}

/// Artwork matching configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtConfig {
    /// Minimum fuzzy score to accept a thumbnail (0.50-0.85)
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Preferred art category
    #[serde(default)]
    pub category: ArtCategory,

    /// Local copy of the thumbnail repository
    #[serde(default)]
    pub mirror: Option<PathBuf>,

    /// Platform tag to repository system folder, e.g. `GBA = "Nintendo - Game Boy Advance"`
    #[serde(default = "default_systems")]
    pub systems: BTreeMap<String, String>,
}

fn default_threshold() -> f64 {
    0.80
}

fn default_systems() -> BTreeMap<String, String> {
    [
        ("GB", "Nintendo - Game Boy"),
        ("GBC", "Nintendo - Game Boy Color"),
        ("GBA", "Nintendo - Game Boy Advance"),
        ("FC", "Nintendo - Nintendo Entertainment System"),
        ("SFC", "Nintendo - Super Nintendo Entertainment System"),
        ("N64", "Nintendo - Nintendo 64"),
        ("MD", "Sega - Mega Drive - Genesis"),
        ("GG", "Sega - Game Gear"),
        ("SMS", "Sega - Master System - Mark III"),
        ("PS", "Sony - PlayStation"),
        ("PCE", "NEC - PC Engine - TurboGrafx 16"),
    ]
    .into_iter()
    .map(|(tag, system)| (tag.to_string(), system.to_string()))
    .collect()
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            category: ArtCategory::default(),
            mirror: None,
            systems: default_systems(),
        }
    }
}

impl ArtConfig {
    /// Repository system folder for a platform tag; the tag itself if unmapped
    pub fn system_for_tag(&self, tag: &str) -> String {
        self.systems
            .get(tag)
            .cloned()
            .unwrap_or_else(|| tag.to_string())
    }
}

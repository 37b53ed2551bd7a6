//! Artwork lookup and thumbnail matching
//!
//! Local art lives at `<rom dir>/.media/<rom base name>.<ext>`. Missing art
//! is located by matching the ROM's file name against the file names of a
//! remote thumbnail repository: first by plain substring, then by a fuzzy
//! score mixing token overlap with an in-order character match of the main
//! title.

use crate::rom::{RomDirectory, RomItem, strip_extension};
use crate::thumbnails::ThumbnailSource;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub use romtender_config::ArtCategory;

/// Threshold used when the configured one is out of range
pub const DEFAULT_THRESHOLD: f64 = 0.80;
pub const MIN_THRESHOLD: f64 = 0.50;
pub const MAX_THRESHOLD: f64 = 0.85;

const TOKEN_WEIGHT: f64 = 0.6;
const TITLE_WEIGHT: f64 = 0.4;
const REGION_BONUS: f64 = 0.10;
const REGIONS: [&str; 2] = ["usa", "europe"];
const LOOKAHEAD: usize = 3;

/// Find the art already stored for a ROM in its directory
///
/// The key is the item's base name, so directory ROMs keep dots in their
/// names. When several images share that key the lexically first wins.
pub fn find_existing_art(item: &RomItem, rom_dir: &RomDirectory) -> Option<PathBuf> {
    let base = item.base_name();
    let entries = fs::read_dir(rom_dir.media_dir()).ok()?;

    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_stem()
                .map(|s| s.to_string_lossy() == base.as_str())
                .unwrap_or(false)
        })
        .collect();

    matches.sort();
    matches.into_iter().next()
}

/// Find and download art for a ROM from a thumbnail source
///
/// `system` names the repository folder for the ROM's platform. Returns the
/// local path of the downloaded image, or `None` when nothing matched or the
/// source failed.
pub fn find_art(
    source: &dyn ThumbnailSource,
    system: &str,
    rom_dir: &RomDirectory,
    item: &RomItem,
    category: ArtCategory,
    threshold: f64,
) -> Option<PathBuf> {
    let subdirectory = format!("{}/{}", system, category.repository_dir());

    let candidates = match source.list_directory(&subdirectory) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("Could not list thumbnails in {}: {}", subdirectory, e);
            return None;
        }
    };

    let base = item.base_name();
    let Some(remote) = match_base_name(&base, &candidates, threshold) else {
        debug!("No thumbnail matched {}", item.filename);
        return None;
    };

    match source.download_art(&subdirectory, &rom_dir.media_dir(), &remote, &base) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Failed to download {} for {}: {}", remote, item.filename, e);
            None
        }
    }
}

/// Clamp a configured threshold into the accepted range
pub fn effective_threshold(threshold: f64) -> f64 {
    if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
        threshold
    } else {
        DEFAULT_THRESHOLD
    }
}

/// Pick the thumbnail for a ROM file name out of `candidates`
pub fn match_thumbnail(filename: &str, candidates: &[String], threshold: f64) -> Option<String> {
    match_base_name(&strip_extension(filename), candidates, threshold)
}

fn match_base_name(base: &str, candidates: &[String], threshold: f64) -> Option<String> {
    let target = base.replace('&', "_").to_lowercase();

    let mut sorted: Vec<&String> = candidates.iter().collect();
    sorted.sort_by_key(|c| c.to_lowercase());

    if let Some(exact) = sorted.iter().find(|c| c.to_lowercase().contains(&target)) {
        debug!("Thumbnail {} matched {} by substring", exact, base);
        return Some((*exact).clone());
    }

    let mut best: Option<(&String, f64)> = None;
    for candidate in sorted {
        let score = fuzzy_score(&target, &strip_extension(candidate).to_lowercase());
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }

    let (candidate, score) = best?;
    let required = (effective_threshold(threshold) * 100.0).round();
    if (score * 100.0).round() >= required {
        debug!("Thumbnail {} matched {} with score {:.2}", candidate, base, score);
        Some(candidate.clone())
    } else {
        None
    }
}

/// Composite similarity of two extension-less, lowercased names
pub fn fuzzy_score(target: &str, candidate: &str) -> f64 {
    let mut score = TOKEN_WEIGHT * token_similarity(target, candidate)
        + TITLE_WEIGHT * title_similarity(main_title(target), main_title(candidate));

    if shares_region(target, candidate) {
        score += REGION_BONUS;
    }

    score.min(1.0)
}

/// Jaccard similarity of whitespace-separated tokens
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }

    a.intersection(&b).count() as f64 / union as f64
}

/// Greedy in-order character match with a short lookahead
pub fn title_similarity(target: &str, candidate: &str) -> f64 {
    let target: Vec<char> = target.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let longest = target.len().max(candidate.len());
    if longest == 0 {
        return 0.0;
    }

    let mut next = 0;
    let mut matches = 0;
    for ch in target {
        let window_end = (next + LOOKAHEAD).min(candidate.len());
        if let Some(offset) = candidate[next.min(window_end)..window_end]
            .iter()
            .position(|&c| c == ch)
        {
            matches += 1;
            next += offset + 1;
        }
    }

    matches as f64 / longest as f64
}

fn main_title(name: &str) -> &str {
    name.split('(').next().unwrap_or(name).trim()
}

fn paren_groups(name: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut rest = name;

    while let Some(start) = rest.find('(') {
        let after = &rest[start + 1..];
        let Some(end) = after.find(')') else {
            break;
        };
        groups.push(&after[..end]);
        rest = &after[end + 1..];
    }

    groups
}

fn shares_region(a: &str, b: &str) -> bool {
    let a_groups = paren_groups(a);
    let b_groups = paren_groups(b);

    if a_groups.is_empty() || b_groups.is_empty() {
        return false;
    }

    REGIONS.iter().any(|region| {
        a_groups.iter().any(|g| g.contains(region)) && b_groups.iter().any(|g| g.contains(region))
    })
}

//! Thumbnail repository contract

use crate::LibraryError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A thumbnail repository organised as `<system>/<category>/<image>`
pub trait ThumbnailSource {
    /// File names available in a repository subdirectory
    fn list_directory(&self, subdirectory: &str) -> Result<Vec<String>, LibraryError>;

    /// Fetch `remote_filename` into `local_dir` as `<target_basename>.<ext>`
    fn download_art(
        &self,
        subdirectory: &str,
        local_dir: &Path,
        remote_filename: &str,
        target_basename: &str,
    ) -> Result<PathBuf, LibraryError>;
}

/// A copy of the thumbnail repository on a local or mounted filesystem
#[derive(Debug, Clone)]
pub struct LocalThumbnailMirror {
    root: PathBuf,
}

impl LocalThumbnailMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ThumbnailSource for LocalThumbnailMirror {
    fn list_directory(&self, subdirectory: &str) -> Result<Vec<String>, LibraryError> {
        let dir = self.root.join(subdirectory);
        if !dir.is_dir() {
            return Err(LibraryError::PathNotFound(dir));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn download_art(
        &self,
        subdirectory: &str,
        local_dir: &Path,
        remote_filename: &str,
        target_basename: &str,
    ) -> Result<PathBuf, LibraryError> {
        let source = self.root.join(subdirectory).join(remote_filename);
        if !source.is_file() {
            return Err(LibraryError::PathNotFound(source));
        }

        let target = match Path::new(remote_filename).extension() {
            Some(ext) => local_dir.join(format!("{}.{}", target_basename, ext.to_string_lossy())),
            None => local_dir.join(target_basename),
        };

        fs::create_dir_all(local_dir)?;
        fs::copy(&source, &target)?;
        debug!("Copied {} to {}", source.display(), target.display());

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mirror_list_and_download() {
        let temp = TempDir::new().unwrap();
        let boxarts = temp.path().join("mirror/Nintendo - Game Boy/Named_Boxarts");
        fs::create_dir_all(&boxarts).unwrap();
        fs::write(boxarts.join("Tetris (World) (Rev 1).png"), b"png").unwrap();
        fs::write(boxarts.join("Dr. Mario (World).png"), b"png").unwrap();

        let mirror = LocalThumbnailMirror::new(temp.path().join("mirror"));
        let listed = mirror
            .list_directory("Nintendo - Game Boy/Named_Boxarts")
            .unwrap();
        assert_eq!(listed, vec!["Dr. Mario (World).png", "Tetris (World) (Rev 1).png"]);

        let media = temp.path().join("roms/.media");
        let path = mirror
            .download_art(
                "Nintendo - Game Boy/Named_Boxarts",
                &media,
                "Tetris (World) (Rev 1).png",
                "Tetris",
            )
            .unwrap();
        assert_eq!(path, media.join("Tetris.png"));
        assert!(path.exists());
    }

    #[test]
    fn test_mirror_missing_directory() {
        let temp = TempDir::new().unwrap();
        let mirror = LocalThumbnailMirror::new(temp.path());
        assert!(matches!(
            mirror.list_directory("Nope/Named_Snaps"),
            Err(LibraryError::PathNotFound(_))
        ));
    }
}

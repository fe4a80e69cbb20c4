use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::SoundId;

/// List of supported audio file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac",
];

/// Scanner for finding sound files in an asset directory
pub struct SoundScanner;

impl SoundScanner {
    /// Scan a directory recursively and return every sound keyed by its file stem
    pub fn scan<P: AsRef<Path>>(directory: P) -> Vec<(SoundId, PathBuf)> {
        let mut sounds = Vec::new();

        for entry in WalkDir::new(directory)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            // Skip directories
            if !path.is_file() || !Self::is_supported(path) {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                debug!("[Scanner] Found sound {:?} at {:?}", stem, path);
                sounds.push((SoundId::from(stem), path.to_path_buf()));
            }
        }

        sounds
    }

    /// Check if the file has a supported extension
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext_str = ext.to_string_lossy().to_lowercase();
                SUPPORTED_EXTENSIONS.contains(&ext_str.as_str())
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_sounds_recursively_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("music")).unwrap();
        fs::write(dir.path().join("jump.WAV"), b"").unwrap();
        fs::write(dir.path().join("music").join("theme.ogg"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let found = SoundScanner::scan(dir.path());
        let ids: Vec<&str> = found.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["jump", "theme"]);
    }

    #[test]
    fn missing_directory_yields_nothing() {
        assert!(SoundScanner::scan("/no/such/assets").is_empty());
    }
}

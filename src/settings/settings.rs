// Settings management and persistence
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AudioError, Result};
use crate::library::SoundId;

/// Volume applied to every stream while unmuted
pub const DEFAULT_VOLUME_MULTIPLIER: f32 = 0.25;

/// Player settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub version: i32, // Settings schema version for future migrations
    pub volume_multiplier: f32, // 0.0-1.0
    pub start_muted: bool,
    /// Output device name; the host default when absent
    pub device_name: Option<String>,
    pub event_capacity: usize,
    pub normalize_loudness: bool,
    pub target_lufs: f64,
    /// Base directory for relative sound paths
    pub asset_dir: Option<PathBuf>,
    pub sounds: BTreeMap<SoundId, PathBuf>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            version: 1,
            volume_multiplier: DEFAULT_VOLUME_MULTIPLIER,
            start_muted: false,
            device_name: None,
            event_capacity: 64,
            normalize_loudness: false,
            target_lufs: -16.0,
            asset_dir: None,
            sounds: BTreeMap::new(),
        }
    }
}

impl PlayerSettings {
    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("[Settings] No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;

        let mut settings: PlayerSettings = serde_json::from_str(&content)
            .map_err(|e| AudioError::Settings(format!("Failed to parse settings: {}", e)))?;
        settings.volume_multiplier = settings.volume_multiplier.clamp(0.0, 1.0);

        info!("[Settings] Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AudioError::Settings(format!("Failed to serialize settings: {}", e)))?;

        fs::write(path, content)?;

        info!("[Settings] Saved settings to {:?}", path);
        Ok(())
    }

    /// Resolve a sound path against `asset_dir`
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.asset_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

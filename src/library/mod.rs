// Sound library module
// Maps sound identifiers to their sources and caches decoded, converted PCM

pub mod scanner;

pub use scanner::SoundScanner;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::decoder::{AudioDecoder, DecodedAudio};
use crate::audio::{loudness, resample, OutputFormat};
use crate::error::{AudioError, Result};
use crate::settings::PlayerSettings;

/// Identifier of a sound resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(String);

impl SoundId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SoundId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SoundId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interleaved PCM ready for the mixer
#[derive(Debug, Clone, PartialEq)]
pub struct SoundData {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl SoundData {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self { samples, sample_rate, channels }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Where a sound comes from
#[derive(Debug, Clone)]
enum SoundSource {
    File(PathBuf),
    Bytes { bytes: Arc<[u8]>, extension: Option<String> },
    Samples(DecodedAudio),
}

pub struct SoundLibrary {
    format: OutputFormat,
    sources: HashMap<SoundId, SoundSource>,
    cache: HashMap<SoundId, Arc<SoundData>>,
    /// Loudness target in LUFS, when normalization is enabled
    target_lufs: Option<f64>,
}

impl SoundLibrary {
    /// Create an empty library producing sounds in the given output format
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            sources: HashMap::new(),
            cache: HashMap::new(),
            target_lufs: None,
        }
    }

    /// Build a library from the sounds listed in the settings
    pub fn from_settings(format: OutputFormat, settings: &PlayerSettings) -> Self {
        let mut library = Self::new(format);
        if settings.normalize_loudness {
            library.target_lufs = Some(settings.target_lufs);
        }

        for (id, path) in &settings.sounds {
            library.register_file(id.clone(), settings.resolve_path(path));
        }

        info!("[Library] {} sounds registered from settings", library.sources.len());
        library
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Enable loudness normalization towards `target_lufs`, or disable it with None
    pub fn set_loudness_target(&mut self, target_lufs: Option<f64>) {
        if self.target_lufs != target_lufs {
            self.target_lufs = target_lufs;
            self.cache.clear();
        }
    }

    pub fn register_file(&mut self, id: SoundId, path: impl Into<PathBuf>) {
        self.insert_source(id, SoundSource::File(path.into()));
    }

    /// Register an encoded sound held in memory; `extension` helps format probing
    pub fn register_bytes(&mut self, id: SoundId, bytes: impl Into<Arc<[u8]>>, extension: Option<&str>) {
        self.insert_source(id, SoundSource::Bytes {
            bytes: bytes.into(),
            extension: extension.map(str::to_string),
        });
    }

    /// Register raw interleaved PCM
    pub fn insert_samples(&mut self, id: SoundId, samples: Vec<f32>, sample_rate: u32, channels: usize) -> Result<()> {
        if channels == 0 || sample_rate == 0 {
            return Err(AudioError::Decode(format!(
                "Invalid PCM layout for {}: {} Hz, {} channels", id, sample_rate, channels
            )));
        }
        self.insert_source(id, SoundSource::Samples(DecodedAudio { samples, sample_rate, channels }));
        Ok(())
    }

    /// Register every supported sound file below `dir`, keyed by file stem
    pub fn register_dir(&mut self, dir: &Path) -> usize {
        let found = SoundScanner::scan(dir);
        let count = found.len();
        for (id, path) in found {
            self.register_file(id, path);
        }
        count
    }

    fn insert_source(&mut self, id: SoundId, source: SoundSource) {
        self.cache.remove(&id);
        self.sources.insert(id, source);
    }

    pub fn contains(&self, id: &SoundId) -> bool {
        self.sources.contains_key(id)
    }

    pub fn is_loaded(&self, id: &SoundId) -> bool {
        self.cache.contains_key(id)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<SoundId> {
        let mut ids: Vec<SoundId> = self.sources.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get a sound ready for playback, decoding it on first use
    pub fn load(&mut self, id: &SoundId) -> Result<Arc<SoundData>> {
        if let Some(data) = self.cache.get(id) {
            return Ok(Arc::clone(data));
        }

        let source = self.sources.get(id)
            .ok_or_else(|| AudioError::UnknownSound(id.clone()))?;

        let decoded = match source {
            SoundSource::File(path) => AudioDecoder::open(path)?.decode_all()?,
            SoundSource::Bytes { bytes, extension } => {
                AudioDecoder::from_bytes(bytes.to_vec(), extension.as_deref())?.decode_all()?
            }
            SoundSource::Samples(audio) => audio.clone(),
        };

        let mut samples = resample::convert(decoded, self.format)?;

        if let Some(target) = self.target_lufs {
            let result = loudness::analyze(
                &samples,
                self.format.channels as usize,
                self.format.sample_rate,
                target,
            )?;
            let gain = result.linear_gain();
            debug!("[Library] Normalizing {} by {:.1} dB", id, result.normalization_gain_db);
            for sample in samples.iter_mut() {
                *sample = (*sample * gain).clamp(-1.0, 1.0);
            }
        }

        let data = Arc::new(SoundData::new(samples, self.format.sample_rate, self.format.channels));
        debug!("[Library] Loaded {} ({} ms)", id, data.duration_ms());
        self.cache.insert(id.clone(), Arc::clone(&data));
        Ok(data)
    }

    /// Decode every registered sound up front. Returns the ids that failed.
    pub fn preload_all(&mut self) -> Vec<(SoundId, AudioError)> {
        let mut failures = Vec::new();
        for id in self.ids() {
            if let Err(e) = self.load(&id) {
                failures.push((id, e));
            }
        }
        failures
    }

    /// Drop the cached PCM for a sound; it is decoded again on next use
    pub fn unload(&mut self, id: &SoundId) -> bool {
        self.cache.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decoder::tests::wav_bytes;

    fn stereo() -> OutputFormat {
        OutputFormat { sample_rate: 8000, channels: 2 }
    }

    #[test]
    fn unknown_sound_is_an_error() {
        let mut library = SoundLibrary::new(stereo());
        let result = library.load(&SoundId::from("missing"));
        assert!(matches!(result, Err(AudioError::UnknownSound(id)) if id.as_str() == "missing"));
    }

    #[test]
    fn samples_are_converted_and_cached() {
        let mut library = SoundLibrary::new(stereo());
        let id = SoundId::from("beep");
        library.insert_samples(id.clone(), vec![0.25, 0.5], 8000, 1).unwrap();

        let first = library.load(&id).unwrap();
        assert_eq!(first.samples(), &[0.25, 0.25, 0.5, 0.5]);
        assert_eq!(first.channels(), 2);
        assert!(library.is_loaded(&id));

        let second = library.load(&id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(library.unload(&id));
        assert!(!library.is_loaded(&id));
    }

    #[test]
    fn embedded_wav_is_decoded() {
        let mut library = SoundLibrary::new(stereo());
        let id = SoundId::from("click");
        library.register_bytes(id.clone(), wav_bytes(8000, 2, &[16384, -16384]), Some("wav"));

        let data = library.load(&id).unwrap();
        assert_eq!(data.frames(), 1);
        assert!((data.samples()[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn invalid_layout_is_rejected() {
        let mut library = SoundLibrary::new(stereo());
        assert!(library.insert_samples(SoundId::from("x"), vec![0.0], 8000, 0).is_err());
        assert!(!library.contains(&SoundId::from("x")));
    }

    #[test]
    fn preload_reports_failures() {
        let mut library = SoundLibrary::new(stereo());
        library.insert_samples(SoundId::from("ok"), vec![0.0; 4], 8000, 2).unwrap();
        library.register_file(SoundId::from("gone"), "/no/such/file.wav");

        let failures = library.preload_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, SoundId::from("gone"));
        assert!(library.is_loaded(&SoundId::from("ok")));
    }
}

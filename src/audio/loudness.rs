// Loudness analysis using EBU R128 standard (LUFS measurement)
// Calculates the normalization gain needed to match a target loudness

use ebur128::{EbuR128, Mode};

use crate::error::{AudioError, Result};

/// Maximum gain to apply (to prevent clipping on very quiet sounds)
const MAX_GAIN_DB: f32 = 12.0;

/// Minimum gain to apply (for very loud sounds)
const MIN_GAIN_DB: f32 = -12.0;

/// Result of loudness analysis
#[derive(Debug, Clone)]
pub struct LoudnessResult {
    /// Integrated loudness in LUFS, None when the sound is too short or silent
    pub integrated_lufs: Option<f64>,
    /// Recommended gain adjustment in dB to reach target loudness
    pub normalization_gain_db: f32,
}

impl LoudnessResult {
    /// Linear amplitude factor for the recommended gain
    pub fn linear_gain(&self) -> f32 {
        10f32.powf(self.normalization_gain_db / 20.0)
    }
}

/// Analyze interleaved samples and compute the gain towards `target_lufs`
pub fn analyze(samples: &[f32], channels: usize, sample_rate: u32, target_lufs: f64) -> Result<LoudnessResult> {
    let mut ebu = EbuR128::new(channels as u32, sample_rate, Mode::I)
        .map_err(|e| AudioError::Decode(format!("Failed to create EBU R128 analyzer: {}", e)))?;

    ebu.add_frames_f32(samples)
        .map_err(|e| AudioError::Decode(format!("Failed to add frames to analyzer: {}", e)))?;

    let integrated = ebu.loudness_global()
        .map_err(|e| AudioError::Decode(format!("Failed to get integrated loudness: {}", e)))?;

    // Sounds shorter than one gating block come back as -inf
    if !integrated.is_finite() {
        return Ok(LoudnessResult {
            integrated_lufs: None,
            normalization_gain_db: 0.0,
        });
    }

    let gain_db = ((target_lufs - integrated) as f32).clamp(MIN_GAIN_DB, MAX_GAIN_DB);

    Ok(LoudnessResult {
        integrated_lufs: Some(integrated),
        normalization_gain_db: gain_db,
    })
}

// Error types for sound loading and playback
use thiserror::Error;

use crate::audio::mixer::VoiceId;
use crate::library::SoundId;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("unknown sound: {0}")]
    UnknownSound(SoundId),

    /// The playback handle was released (stopped, completed or never created).
    #[error("voice {0} has been released")]
    Released(VoiceId),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("resample failed: {0}")]
    Resample(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AudioError>;

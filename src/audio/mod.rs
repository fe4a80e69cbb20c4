// Audio playback module
// Uses Symphonia for decoding, a software mixer for the streams and cpal for output

pub mod decoder;
pub mod loudness;
pub mod mixer;
pub mod output;
pub mod player;
pub mod resample;
pub mod voice;

pub use mixer::{EventReceiver, Mixer, PlaybackEvent, SharedMixer, VoiceId};
pub use output::{AudioOutput, OutputDevice};
pub use player::AudioPlayer;
pub use voice::{Voice, VoiceState};

/// Sample layout expected by the output device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

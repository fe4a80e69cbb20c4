// A single playback handle inside the mixer
use std::sync::Arc;

use crate::library::{SoundData, SoundId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Created but not started yet
    Prepared,
    Playing,
    Paused,
}

pub struct Voice {
    sound: SoundId,
    data: Arc<SoundData>,
    /// Next frame to render
    cursor: usize,
    looping: bool,
    volume: f32,
    state: VoiceState,
}

impl Voice {
    pub fn new(sound: SoundId, data: Arc<SoundData>, looping: bool) -> Self {
        Self {
            sound,
            data,
            cursor: 0,
            looping,
            volume: 1.0,
            state: VoiceState::Prepared,
        }
    }

    pub fn sound(&self) -> &SoundId {
        &self.sound
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == VoiceState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the voice volume (0.0 to 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn start(&mut self) {
        self.state = VoiceState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == VoiceState::Playing {
            self.state = VoiceState::Paused;
        }
    }

    /// Position in frames
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Mix this voice into an interleaved buffer.
    /// Returns true once a non-looping voice has played to the end.
    pub fn render(&mut self, out: &mut [f32], channels: usize) -> bool {
        if self.state != VoiceState::Playing {
            return false;
        }

        let frames = self.data.frames();
        // Sounds are converted to the output layout on load; anything else can't be mixed
        if frames == 0 || channels == 0 || self.data.channels() as usize != channels {
            return true;
        }

        let samples = self.data.samples();
        for out_frame in out.chunks_exact_mut(channels) {
            if self.cursor >= frames {
                if self.looping {
                    self.cursor = 0;
                } else {
                    return true;
                }
            }

            let start = self.cursor * channels;
            for (dst, src) in out_frame.iter_mut().zip(&samples[start..start + channels]) {
                *dst += src * self.volume;
            }
            self.cursor += 1;
        }

        !self.looping && self.cursor >= frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(samples: Vec<f32>, looping: bool) -> Voice {
        let data = Arc::new(SoundData::new(samples, 48000, 1));
        Voice::new(SoundId::from("blip"), data, looping)
    }

    #[test]
    fn prepared_voice_is_silent() {
        let mut v = voice(vec![1.0, 1.0], false);
        let mut out = [0.0; 2];
        assert!(!v.render(&mut out, 1));
        assert_eq!(out, [0.0, 0.0]);
        assert!(!v.is_playing());
    }

    #[test]
    fn renders_with_volume_and_completes() {
        let mut v = voice(vec![1.0, 0.5], false);
        v.set_volume(0.5);
        v.start();
        let mut out = [0.0; 4];
        assert!(v.render(&mut out, 1));
        assert_eq!(out, [0.5, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn looping_voice_wraps() {
        let mut v = voice(vec![0.1, 0.2], true);
        v.start();
        let mut out = [0.0; 5];
        assert!(!v.render(&mut out, 1));
        assert_eq!(out, [0.1, 0.2, 0.1, 0.2, 0.1]);
        assert_eq!(v.position(), 1);
    }

    #[test]
    fn pause_only_from_playing() {
        let mut v = voice(vec![0.1], false);
        v.pause();
        assert_eq!(v.state(), VoiceState::Prepared);
        v.start();
        v.pause();
        assert_eq!(v.state(), VoiceState::Paused);
        let mut out = [0.0; 1];
        assert!(!v.render(&mut out, 1));
        assert_eq!(v.position(), 0);
    }

    #[test]
    fn empty_sound_completes_even_when_looping() {
        let mut v = voice(vec![], true);
        v.start();
        assert!(v.render(&mut [0.0; 4], 1));
    }

    #[test]
    fn volume_is_clamped() {
        let mut v = voice(vec![0.1], false);
        v.set_volume(3.0);
        assert_eq!(v.volume(), 1.0);
        v.set_volume(-1.0);
        assert_eq!(v.volume(), 0.0);
    }
}

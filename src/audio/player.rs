// Sound stream manager
// Plays, loops, mutes, pauses and stops named sounds on top of the mixer

use log::{debug, info, warn};
use std::collections::HashMap;

use super::mixer::{EventReceiver, Mixer, PlaybackEvent, SharedMixer, VoiceId};
use super::output::{AudioOutput, OutputDevice};
use super::OutputFormat;
use crate::error::{AudioError, Result};
use crate::library::{SoundId, SoundLibrary};
use crate::settings::PlayerSettings;

/// Handles playback of multiple named streams, including repeats, stopping and muting.
///
/// Every active sound has one entry mapping its id to a mixer voice. Entries of
/// non-looping sounds disappear once the mixer reports them completed, which is
/// picked up by [`AudioPlayer::process_events`] (also run at the start of every
/// other operation).
pub struct AudioPlayer {
    library: SoundLibrary,
    mixer: SharedMixer,
    events: EventReceiver,
    streams: HashMap<SoundId, VoiceId>,
    muted: bool,
    volume_multiplier: f32,
    output: Option<AudioOutput>,
}

impl AudioPlayer {
    /// Open the configured output device and start the mixer on it
    pub fn new(settings: &PlayerSettings) -> Result<Self> {
        let device = OutputDevice::open(settings.device_name.as_deref())?;
        let mut player = Self::headless(settings, device.format())?;
        player.output = Some(device.start(player.mixer.clone())?);
        Ok(player)
    }

    /// A player without an output device. The caller pulls audio with
    /// `mixer().lock().render(..)`.
    pub fn headless(settings: &PlayerSettings, format: OutputFormat) -> Result<Self> {
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(AudioError::Device(format!(
                "Invalid output format: {} Hz, {} channels", format.sample_rate, format.channels
            )));
        }

        let (mixer, events) = Mixer::shared(format, settings.event_capacity);

        Ok(Self {
            library: SoundLibrary::from_settings(format, settings),
            mixer,
            events,
            streams: HashMap::new(),
            muted: settings.start_muted,
            volume_multiplier: settings.volume_multiplier.clamp(0.0, 1.0),
            output: None,
        })
    }

    pub fn library(&self) -> &SoundLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut SoundLibrary {
        &mut self.library
    }

    pub fn mixer(&self) -> SharedMixer {
        self.mixer.clone()
    }

    pub fn format(&self) -> OutputFormat {
        self.output
            .as_ref()
            .map(AudioOutput::format)
            .unwrap_or_else(|| self.library.format())
    }

    /// Play a sound identified by its id.
    ///
    /// If `looping` is set the sound repeats until stopped. A sound that is
    /// already active under the same id is released and replaced.
    pub fn play_track(&mut self, id: &SoundId, looping: bool) -> Result<()> {
        self.process_events();

        let data = self.library.load(id)?;
        let volume = self.current_volume();

        let mut mixer = self.mixer.lock();
        if let Some(previous) = self.streams.remove(id) {
            // Already gone if it completed since the last event pump
            let _ = mixer.release(previous);
        }

        let voice_id = mixer.create_voice(id.clone(), data, looping);
        let voice = mixer.voice_mut(voice_id)?;
        voice.set_volume(volume);
        voice.start();
        drop(mixer);

        debug!("[Player] Playing {} (voice {}, looping: {})", id, voice_id, looping);
        self.streams.insert(id.clone(), voice_id);
        Ok(())
    }

    /// Stop all other streams and only play this sound.
    ///
    /// Nothing happens if the sound is already playing; otherwise every stream
    /// is stopped and the sound starts from the beginning.
    pub fn play_track_exclusive(&mut self, id: &SoundId, looping: bool) -> Result<()> {
        self.process_events();

        let restart = match self.streams.get(id) {
            None => true,
            Some(&voice_id) => match self.mixer.lock().is_playing(voice_id) {
                Ok(playing) => !playing,
                Err(AudioError::Released(_)) => {
                    debug!("[Player] Voice {} for {} was already released", voice_id, id);
                    true
                }
                Err(e) => return Err(e),
            },
        };

        if restart {
            self.stop_all();
            self.play_track(id, looping)?;
        }

        Ok(())
    }

    /// Stop a sound and release its voice
    pub fn stop(&mut self, id: &SoundId) {
        self.process_events();

        if let Some(voice_id) = self.streams.remove(id) {
            if self.mixer.lock().release(voice_id).is_ok() {
                debug!("[Player] Stopped {}", id);
            }
        }
    }

    pub fn mute_all(&mut self) {
        self.process_events();
        self.muted = true;
        self.apply_volume();
        info!("[Player] Muted");
    }

    pub fn unmute_all(&mut self) {
        self.process_events();
        self.muted = false;
        self.apply_volume();
        info!("[Player] Unmuted");
    }

    pub fn pause_all(&mut self) {
        self.process_events();

        let mut mixer = self.mixer.lock();
        for voice_id in self.streams.values() {
            if let Ok(voice) = mixer.voice_mut(*voice_id) {
                voice.pause();
            }
        }
    }

    /// Start every stream again with the current (mute-aware) volume
    pub fn resume_all(&mut self) {
        self.process_events();

        let volume = self.current_volume();
        let mut mixer = self.mixer.lock();
        for voice_id in self.streams.values() {
            if let Ok(voice) = mixer.voice_mut(*voice_id) {
                voice.set_volume(volume);
                voice.start();
            }
        }
    }

    pub fn stop_all(&mut self) {
        self.process_events();

        let mut mixer = self.mixer.lock();
        for (id, voice_id) in self.streams.drain() {
            if mixer.release(voice_id).is_ok() {
                debug!("[Player] Stopped {}", id);
            }
        }
    }

    /// Whether the sound has an active, currently playing stream
    pub fn is_playing(&mut self, id: &SoundId) -> bool {
        self.process_events();

        match self.streams.get(id) {
            Some(&voice_id) => self.mixer.lock().is_playing(voice_id).unwrap_or(false),
            None => false,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn volume_multiplier(&self) -> f32 {
        self.volume_multiplier
    }

    /// Change the volume used for unmuted streams (0.0 to 1.0)
    pub fn set_volume_multiplier(&mut self, multiplier: f32) {
        self.process_events();
        self.volume_multiplier = multiplier.clamp(0.0, 1.0);
        if !self.muted {
            self.apply_volume();
        }
    }

    /// Ids of all active streams, sorted
    pub fn active_sounds(&mut self) -> Vec<SoundId> {
        self.process_events();

        let mut ids: Vec<SoundId> = self.streams.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn stream_count(&mut self) -> usize {
        self.process_events();
        self.streams.len()
    }

    /// Collect mixer notifications and drop streams that have finished.
    ///
    /// Returns the events so a game can react to completed sounds.
    pub fn process_events(&mut self) -> Vec<PlaybackEvent> {
        let events = self.events.drain();

        for event in &events {
            match event {
                PlaybackEvent::Completed { voice, sound } => {
                    // The id may have been replayed since; only drop the finished voice
                    if self.streams.get(sound) == Some(voice) {
                        self.streams.remove(sound);
                        debug!("[Player] {} completed", sound);
                    }
                }
            }
        }

        // Catch completions whose events were dropped
        let mut mixer = self.mixer.lock();
        let dropped = mixer.take_dropped_events();
        if dropped > 0 {
            warn!("[Player] Event queue overflowed, {} completions were dropped", dropped);
        }
        let before = self.streams.len();
        self.streams.retain(|_, voice_id| mixer.contains(*voice_id));
        if self.streams.len() != before {
            debug!("[Player] Swept {} finished streams", before - self.streams.len());
        }

        events
    }

    fn current_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume_multiplier
        }
    }

    fn apply_volume(&mut self) {
        let volume = self.current_volume();
        let mut mixer = self.mixer.lock();
        for voice_id in self.streams.values() {
            if let Ok(voice) = mixer.voice_mut(*voice_id) {
                voice.set_volume(volume);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_VOLUME_MULTIPLIER;

    fn player() -> AudioPlayer {
        let format = OutputFormat { sample_rate: 8000, channels: 1 };
        let mut player = AudioPlayer::headless(&PlayerSettings::default(), format).unwrap();
        let library = player.library_mut();
        library.insert_samples(SoundId::from("short"), vec![1.0; 4], 8000, 1).unwrap();
        library.insert_samples(SoundId::from("music"), vec![1.0; 16], 8000, 1).unwrap();
        player
    }

    fn render(player: &AudioPlayer, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        player.mixer().lock().render(&mut out);
        out
    }

    #[test]
    fn play_applies_volume_multiplier() {
        let mut player = player();
        player.play_track(&SoundId::from("short"), false).unwrap();
        assert!(player.is_playing(&SoundId::from("short")));
        assert_eq!(render(&player, 1), vec![DEFAULT_VOLUME_MULTIPLIER]);
    }

    #[test]
    fn replay_replaces_previous_voice() {
        let mut player = player();
        let id = SoundId::from("music");
        player.play_track(&id, true).unwrap();
        player.play_track(&id, true).unwrap();
        assert_eq!(player.stream_count(), 1);
        assert_eq!(player.mixer().lock().voice_count(), 1);
    }

    #[test]
    fn stale_completed_event_keeps_new_voice() {
        let mut player = player();
        let id = SoundId::from("short");
        player.play_track(&id, false).unwrap();
        let old_voice = player.streams[&id];
        render(&player, 8);

        // A newer voice takes over the entry before the completion is pumped
        let data = player.library.load(&id).unwrap();
        let new_voice = {
            let mut mixer = player.mixer.lock();
            let voice_id = mixer.create_voice(id.clone(), data, true);
            mixer.voice_mut(voice_id).unwrap().start();
            voice_id
        };
        player.streams.insert(id.clone(), new_voice);

        let events = player.process_events();
        assert_eq!(events, vec![PlaybackEvent::Completed { voice: old_voice, sound: id.clone() }]);
        assert_eq!(player.streams.get(&id), Some(&new_voice));
        assert!(player.is_playing(&id));
    }

    #[test]
    fn finished_sound_is_not_reported_active() {
        let mut player = player();
        player.play_track(&SoundId::from("short"), false).unwrap();
        render(&player, 16);

        assert!(player.active_sounds().is_empty());
        assert_eq!(player.stream_count(), 0);
    }

    #[test]
    fn zero_channel_output_is_rejected() {
        let format = OutputFormat { sample_rate: 8000, channels: 0 };
        let result = AudioPlayer::headless(&PlayerSettings::default(), format);
        assert!(matches!(result, Err(AudioError::Device(_))));

        let format = OutputFormat { sample_rate: 0, channels: 2 };
        assert!(AudioPlayer::headless(&PlayerSettings::default(), format).is_err());
    }

    #[test]
    fn headless_player_reports_library_format() {
        let player = player();
        assert_eq!(player.format(), OutputFormat { sample_rate: 8000, channels: 1 });
    }
}

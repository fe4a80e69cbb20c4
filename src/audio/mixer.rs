// Software mixer shared between the control thread and the cpal callback
// Completion events leave the audio thread through a lock-free ring buffer

use log::warn;
use parking_lot::Mutex;
use ringbuf::{HeapRb, traits::{Consumer, Producer, Split}};
use std::collections::HashMap;
use std::sync::Arc;

use super::voice::Voice;
use super::OutputFormat;
use crate::error::{AudioError, Result};
use crate::library::{SoundData, SoundId};

pub type VoiceId = u64;

pub type SharedMixer = Arc<Mutex<Mixer>>;

type EventProducer = ringbuf::HeapProd<PlaybackEvent>;
type EventConsumer = ringbuf::HeapCons<PlaybackEvent>;

/// Notifications emitted by the mixer while rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A non-looping voice played to the end and was released
    Completed { voice: VoiceId, sound: SoundId },
}

/// Control-side end of the event queue
pub struct EventReceiver {
    consumer: EventConsumer,
}

impl EventReceiver {
    pub fn try_recv(&mut self) -> Option<PlaybackEvent> {
        self.consumer.try_pop()
    }

    /// Take every pending event
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.consumer.try_pop() {
            events.push(event);
        }
        events
    }
}

pub struct Mixer {
    format: OutputFormat,
    voices: HashMap<VoiceId, Voice>,
    next_id: VoiceId,
    events: EventProducer,
    /// Completions that didn't fit in the event queue since the last check
    dropped_events: usize,
    finished: Vec<VoiceId>,
}

impl Mixer {
    /// Create a mixer and the receiver for its events
    pub fn new(format: OutputFormat, event_capacity: usize) -> (Self, EventReceiver) {
        let rb = HeapRb::<PlaybackEvent>::new(event_capacity.max(1));
        let (producer, consumer) = rb.split();

        let mixer = Self {
            format,
            voices: HashMap::new(),
            next_id: 1,
            events: producer,
            dropped_events: 0,
            finished: Vec::new(),
        };

        (mixer, EventReceiver { consumer })
    }

    /// Same as `new`, wrapped for sharing with the audio thread
    pub fn shared(format: OutputFormat, event_capacity: usize) -> (SharedMixer, EventReceiver) {
        let (mixer, events) = Self::new(format, event_capacity);
        (Arc::new(Mutex::new(mixer)), events)
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Create a new voice in the prepared state
    pub fn create_voice(&mut self, sound: SoundId, data: Arc<SoundData>, looping: bool) -> VoiceId {
        if data.channels() != self.format.channels {
            warn!(
                "[Mixer] {} has {} channels but the output has {}; it will complete without playing",
                sound, data.channels(), self.format.channels
            );
        }

        let id = self.next_id;
        self.next_id += 1;
        self.voices.insert(id, Voice::new(sound, data, looping));
        id
    }

    pub fn voice(&self, id: VoiceId) -> Result<&Voice> {
        self.voices.get(&id).ok_or(AudioError::Released(id))
    }

    pub fn voice_mut(&mut self, id: VoiceId) -> Result<&mut Voice> {
        self.voices.get_mut(&id).ok_or(AudioError::Released(id))
    }

    /// Query a voice; released voices are an error, not "stopped"
    pub fn is_playing(&self, id: VoiceId) -> Result<bool> {
        self.voice(id).map(Voice::is_playing)
    }

    /// Stop and drop a voice
    pub fn release(&mut self, id: VoiceId) -> Result<()> {
        self.voices.remove(&id).map(|_| ()).ok_or(AudioError::Released(id))
    }

    pub fn release_all(&mut self) {
        self.voices.clear();
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        self.voices.contains_key(&id)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Number of completion events lost to a full queue, resetting the count
    pub fn take_dropped_events(&mut self) -> usize {
        std::mem::take(&mut self.dropped_events)
    }

    /// Render all voices into an interleaved output buffer
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let channels = self.format.channels as usize;

        for (id, voice) in self.voices.iter_mut() {
            if voice.render(out, channels) {
                self.finished.push(*id);
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        for id in self.finished.drain(..) {
            if let Some(voice) = self.voices.remove(&id) {
                let event = PlaybackEvent::Completed { voice: id, sound: voice.sound().clone() };
                if self.events.try_push(event).is_err() {
                    self.dropped_events += 1;
                }
            }
        }
    }
}

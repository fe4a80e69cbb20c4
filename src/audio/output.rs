// Audio output using cpal
// The device callback pulls mixed samples straight from the shared mixer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, SupportedStreamConfig};
use log::{error, info};

use super::mixer::SharedMixer;
use super::OutputFormat;
use crate::error::{AudioError, Result};

/// An output device that has not been started yet
pub struct OutputDevice {
    device: Device,
    config: SupportedStreamConfig,
}

/// Running output stream; playback stops when this is dropped
pub struct AudioOutput {
    _stream: Stream,
    format: OutputFormat,
}

impl OutputDevice {
    /// Open the named output device, or the default one
    pub fn open(name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match name {
            Some(name) => host.output_devices()
                .map_err(|e| AudioError::Device(format!("Failed to list output devices: {}", e)))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| AudioError::Device(format!("Output device not found: {}", name)))?,
            None => host.default_output_device()
                .ok_or_else(|| AudioError::Device("No output device available".to_string()))?,
        };

        let config = device.default_output_config()
            .map_err(|e| AudioError::Device(format!("Failed to get default output config: {}", e)))?;

        Ok(Self { device, config })
    }

    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn format(&self) -> OutputFormat {
        OutputFormat {
            sample_rate: self.config.sample_rate().0,
            channels: self.config.channels(),
        }
    }

    /// Build the output stream feeding from `mixer` and start it
    pub fn start(self, mixer: SharedMixer) -> Result<AudioOutput> {
        let format = self.format();
        let name = self.name();
        let config: StreamConfig = self.config.config();

        // Build the output stream based on sample format
        let stream = match self.config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&self.device, &config, mixer)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&self.device, &config, mixer)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&self.device, &config, mixer)?,
            other => {
                return Err(AudioError::Device(format!("Unsupported sample format: {:?}", other)))
            }
        };

        stream.play()
            .map_err(|e| AudioError::Device(format!("Failed to start stream: {}", e)))?;

        info!("[Output] Playing on {} ({} Hz, {} channels)", name, format.sample_rate, format.channels);

        Ok(AudioOutput {
            _stream: stream,
            format,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        mixer: SharedMixer,
    ) -> Result<Stream> {
        let mut scratch: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.lock().render(&mut scratch);

                for (sample, value) in data.iter_mut().zip(&scratch) {
                    *sample = T::from_sample(*value);
                }
            },
            move |err| {
                error!("[Output] Audio output error: {}", err);
            },
            None,
        ).map_err(|e| AudioError::Device(format!("Failed to build output stream: {}", e)))?;

        Ok(stream)
    }
}

impl AudioOutput {
    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

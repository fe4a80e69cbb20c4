// Conversion of decoded sounds into the output device format
// Channel remapping followed by sample rate conversion with rubato

use rubato::{FftFixedIn, Resampler};

use super::decoder::DecodedAudio;
use super::OutputFormat;
use crate::error::{AudioError, Result};

/// Input frames handed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Convert decoded audio to the given output format
pub fn convert(audio: DecodedAudio, format: OutputFormat) -> Result<Vec<f32>> {
    let channels = format.channels as usize;
    if channels == 0 || format.sample_rate == 0 {
        return Err(AudioError::Resample(format!(
            "Invalid output format: {} Hz, {} channels", format.sample_rate, format.channels
        )));
    }

    let remapped = remap_channels(&audio.samples, audio.channels, channels);

    if audio.sample_rate == format.sample_rate || remapped.is_empty() {
        return Ok(remapped);
    }

    resample(&remapped, channels, audio.sample_rate, format.sample_rate)
}

/// Remap interleaved samples from `src` channels to `dst` channels
pub fn remap_channels(samples: &[f32], src: usize, dst: usize) -> Vec<f32> {
    if src == dst || src == 0 || dst == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / src;
    let mut out = Vec::with_capacity(frames * dst);

    for frame in samples.chunks_exact(src) {
        if dst == 1 {
            // Downmix to mono
            out.push(frame.iter().sum::<f32>() / src as f32);
        } else if src == 1 {
            out.extend(std::iter::repeat(frame[0]).take(dst));
        } else {
            for c in 0..dst {
                out.push(frame[if c < src { c } else { c % src }]);
            }
        }
    }

    out
}

/// Resample interleaved audio between sample rates
pub fn resample(samples: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    let planar = deinterleave(samples, channels);
    let total_frames = planar[0].len();
    let expected_frames =
        (total_frames as f64 * to_rate as f64 / from_rate as f64).round() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_FRAMES,
        2,
        channels,
    ).map_err(|e| AudioError::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected_frames + delay); channels];
    let mut pos = 0;

    loop {
        let needed = resampler.input_frames_next();
        if total_frames - pos < needed {
            break;
        }
        let chunk: Vec<&[f32]> = planar.iter().map(|ch| &ch[pos..pos + needed]).collect();
        let processed = resampler.process(&chunk[..], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        append_planar(&mut output, processed);
        pos += needed;
    }

    if pos < total_frames {
        let chunk: Vec<&[f32]> = planar.iter().map(|ch| &ch[pos..]).collect();
        let processed = resampler.process_partial(Some(&chunk[..]), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        append_planar(&mut output, processed);
    }

    // Flush until the delayed tail is out
    while output[0].len() < expected_frames + delay {
        let processed = resampler.process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if processed[0].is_empty() {
            break;
        }
        append_planar(&mut output, processed);
    }

    let mut interleaved = Vec::with_capacity(expected_frames * channels);
    for frame in delay..(delay + expected_frames) {
        for ch in &output {
            interleaved.push(ch.get(frame).copied().unwrap_or(0.0));
        }
    }

    Ok(interleaved)
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (ch, sample) in frame.iter().enumerate() {
            planar[ch].push(*sample);
        }
    }
    planar
}

fn append_planar(output: &mut [Vec<f32>], processed: Vec<Vec<f32>>) {
    for (out, chunk) in output.iter_mut().zip(processed) {
        out.extend_from_slice(&chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_duplicated_to_stereo() {
        assert_eq!(remap_channels(&[0.1, 0.2], 1, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn stereo_is_averaged_to_mono() {
        assert_eq!(remap_channels(&[0.25, 0.75, -1.0, 1.0], 2, 1), vec![0.5, 0.0]);
    }

    #[test]
    fn surround_keeps_front_pair() {
        let frame = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(remap_channels(&frame, 6, 2), vec![1.0, 2.0]);
        assert_eq!(remap_channels(&[1.0, 2.0], 2, 4), vec![1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn equal_rates_pass_through() {
        let audio = DecodedAudio { samples: vec![0.5, -0.5, 0.25, -0.25], sample_rate: 48000, channels: 2 };
        let out = convert(audio, OutputFormat { sample_rate: 48000, channels: 2 }).unwrap();
        assert_eq!(out, vec![0.5, -0.5, 0.25, -0.25]);
    }

    #[test]
    fn empty_output_layout_is_an_error() {
        let audio = DecodedAudio { samples: vec![0.5; 4], sample_rate: 44100, channels: 1 };
        let result = convert(audio, OutputFormat { sample_rate: 8000, channels: 0 });
        assert!(matches!(result, Err(AudioError::Resample(_))));
    }

    #[test]
    fn resampling_scales_frame_count() {
        let frames = 4410;
        let samples: Vec<f32> = (0..frames)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 44100.0).sin() * 0.5)
            .collect();
        let audio = DecodedAudio { samples, sample_rate: 44100, channels: 1 };

        let out = convert(audio, OutputFormat { sample_rate: 48000, channels: 2 }).unwrap();
        assert_eq!(out.len(), 4800 * 2);
        assert!(out.iter().all(|s| s.abs() <= 1.0));
    }
}

// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Melodies played on a recorded sample.
//!
//! The sample is taken to sound at its base note. Each note is the sample
//! resampled by `note / base`, trimmed or filled out to the note's length.

use super::{pitch, Note};
use crate::audio::{
    buffer::{self, BufferError, SampleBuffer},
    resample::{self, ResampleError},
};

/// The base note used when none is given.
pub const DEFAULT_BASE_NOTE: &str = "C3";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SamplerError {
    #[error("Sample has no audio")]
    EmptySample,

    #[error("Invalid base note: {0}")]
    InvalidBaseNote(String),

    #[error(transparent)]
    Resample(#[from] ResampleError),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Renders notes from a sample recorded at a known pitch.
#[derive(Debug, Clone)]
pub struct Sampler {
    sample: SampleBuffer,
    base_frequency: f64,
    volume: f64,
    looping: bool,
}

impl Sampler {
    /// Creates a sampler. The base note is a note name like "C3" or a
    /// frequency in Hz.
    pub fn new(sample: SampleBuffer, base_note: &str) -> Result<Sampler, SamplerError> {
        if sample.is_empty() {
            return Err(SamplerError::EmptySample);
        }
        let base_frequency = match pitch::parse_pitch(base_note) {
            Ok(frequency) if frequency > 0.0 => frequency,
            _ => return Err(SamplerError::InvalidBaseNote(base_note.to_string())),
        };

        Ok(Sampler {
            sample,
            base_frequency,
            volume: 1.0,
            looping: false,
        })
    }

    /// Sets the output level, clamped to [0, 1].
    pub fn with_volume(mut self, volume: f64) -> Sampler {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Repeats the sample to fill notes longer than it. Otherwise the
    /// remainder of the note is silence.
    pub fn with_looping(mut self, looping: bool) -> Sampler {
        self.looping = looping;
        self
    }

    pub fn base_frequency(&self) -> f64 {
        self.base_frequency
    }

    /// Output rate, which is the sample's own rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample.sample_rate()
    }

    /// Renders one note.
    pub fn render_note(&self, note: &Note) -> Result<SampleBuffer, SamplerError> {
        let rate = self.sample.sample_rate();
        let total = buffer::frame_count(note.duration_seconds, rate)?;
        if note.is_rest() || total == 0 {
            return Ok(SampleBuffer::silence(total, rate)?);
        }

        let ratio = note.frequency / self.base_frequency;
        // Only the source frames the note reaches are resampled.
        let needed = ((total as f64) * ratio).ceil() + 1.0;
        let source = if needed < self.sample.len() as f64 {
            SampleBuffer::new(self.sample.samples()[..needed as usize].to_vec(), rate)?
        } else {
            self.sample.clone()
        };
        let pitched = resample::resample(&source, ratio)?;

        let mut samples: Vec<i16> = if self.looping {
            pitched.samples().iter().cycle().take(total).copied().collect()
        } else {
            pitched.samples().iter().take(total).copied().collect()
        };
        samples.resize(total, 0);

        if self.volume < 1.0 {
            for sample in samples.iter_mut() {
                *sample = (f64::from(*sample) * self.volume).round() as i16;
            }
        }
        Ok(SampleBuffer::new(samples, rate)?)
    }

    /// Renders a phrase into one buffer. Fails before rendering anything if
    /// the phrase is longer than the buffer limit.
    pub fn render(&self, notes: &[Note]) -> Result<SampleBuffer, SamplerError> {
        let rate = self.sample.sample_rate();
        notes.iter().try_fold(0, |total, note| {
            let frames = buffer::frame_count(note.duration_seconds, rate)?;
            buffer::check_frame_count(total as f64 + frames as f64)
        })?;

        let buffers = notes
            .iter()
            .map(|note| self.render_note(note))
            .collect::<Result<Vec<SampleBuffer>, SamplerError>>()?;
        Ok(SampleBuffer::concat(&buffers, rate)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ramp() -> SampleBuffer {
        SampleBuffer::new((0..8).map(|i| i * 100).collect(), 8000).unwrap()
    }

    fn note(frequency: f64, frames: usize) -> Note {
        Note {
            frequency,
            duration_seconds: frames as f64 / 8000.0,
        }
    }

    #[test]
    fn test_base_note_plays_sample() {
        let sampler = Sampler::new(ramp(), "440").unwrap();
        let output = sampler.render_note(&note(440.0, 8)).unwrap();
        assert_eq!(output, ramp());

        // Short notes use only the start of the sample.
        let output = sampler.render_note(&note(440.0, 4)).unwrap();
        assert_eq!(output.samples(), &[0, 100, 200, 300]);
    }

    #[test]
    fn test_octave_up() {
        let sampler = Sampler::new(ramp(), "440").unwrap();
        let output = sampler.render_note(&note(880.0, 4)).unwrap();
        assert_eq!(output.samples(), &[0, 200, 400, 600]);
    }

    #[test]
    fn test_octave_down_interpolates() {
        let sampler = Sampler::new(ramp(), "440").unwrap();
        let output = sampler.render_note(&note(220.0, 6)).unwrap();
        assert_eq!(output.samples(), &[0, 50, 100, 150, 200, 250]);
    }

    #[test]
    fn test_long_note_pads_or_loops() {
        let sampler = Sampler::new(ramp(), "440").unwrap();
        let padded = sampler.render_note(&note(880.0, 10)).unwrap();
        assert_eq!(padded.samples(), &[0, 200, 400, 600, 0, 0, 0, 0, 0, 0]);

        let looped = sampler
            .with_looping(true)
            .render_note(&note(880.0, 10))
            .unwrap();
        assert_eq!(
            looped.samples(),
            &[0, 200, 400, 600, 0, 200, 400, 600, 0, 200]
        );
    }

    #[test]
    fn test_rest_and_volume() {
        let sampler = Sampler::new(ramp(), "440").unwrap().with_volume(0.5);
        let rest = sampler.render_note(&note(0.0, 5)).unwrap();
        assert_eq!(rest.samples(), &[0; 5]);

        let quiet = sampler.render_note(&note(440.0, 3)).unwrap();
        assert_eq!(quiet.samples(), &[0, 50, 100]);
    }

    #[test]
    fn test_render_phrase() {
        let sampler = Sampler::new(ramp(), DEFAULT_BASE_NOTE).unwrap();
        let base = sampler.base_frequency();
        let phrase = sampler
            .render(&[note(base, 4), note(0.0, 2), note(base * 2.0, 2)])
            .unwrap();
        assert_eq!(phrase.samples(), &[0, 100, 200, 300, 0, 0, 0, 200]);
        assert_eq!(phrase.sample_rate(), 8000);
    }

    #[test]
    fn test_invalid_sampler() {
        assert_eq!(
            Sampler::new(ramp(), "Z9").unwrap_err(),
            SamplerError::InvalidBaseNote("Z9".to_string())
        );
        assert!(Sampler::new(ramp(), "rest").is_err());
        let empty = SampleBuffer::new(Vec::new(), 8000).unwrap();
        assert_eq!(
            Sampler::new(empty, "C3").unwrap_err(),
            SamplerError::EmptySample
        );
    }

    #[test]
    fn test_overlong_note_rejected() {
        let sampler = Sampler::new(ramp(), "C3").unwrap();
        let notes = crate::melody::compile("C4:1e30").unwrap();
        assert!(matches!(
            sampler.render(&notes),
            Err(SamplerError::Buffer(BufferError::TooLong { .. }))
        ));
    }
}

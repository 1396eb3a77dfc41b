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
use std::{error::Error, f64::consts::PI, fmt, str::FromStr};

use serde::Deserialize;

use super::Note;
use crate::audio::buffer::{self, BufferError, SampleBuffer};

/// Default synthesis rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Default output level.
pub const DEFAULT_VOLUME: f64 = 0.6;
/// Default fraction of each note that sounds.
pub const DEFAULT_ARTICULATION: f64 = 0.9;

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Saw,
}

impl Waveform {
    /// Evaluates the waveform at a phase in [0, 1).
    fn at(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Saw => 2.0 * phase - 1.0,
        }
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Saw => "saw",
        }
    }
}

impl FromStr for Waveform {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "triangle" => Ok(Waveform::Triangle),
            "saw" => Ok(Waveform::Saw),
            _ => Err(format!("Unsupported waveform: {}", s).into()),
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Renders notes into mono 16-bit buffers. Pure: the same notes always render
/// the same samples.
#[derive(Debug, Clone, Copy)]
pub struct Synth {
    sample_rate: u32,
    volume: f64,
    waveform: Waveform,
    articulation: f64,
}

impl Synth {
    /// Creates a synth at the given rate with default voice settings.
    pub fn new(sample_rate: u32) -> Result<Synth, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        Ok(Synth {
            sample_rate,
            volume: DEFAULT_VOLUME,
            waveform: Waveform::default(),
            articulation: DEFAULT_ARTICULATION,
        })
    }

    /// Sets the output level, clamped to [0, 1].
    pub fn with_volume(mut self, volume: f64) -> Synth {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Synth {
        self.waveform = waveform;
        self
    }

    /// Sets the sounding fraction of each note, clamped to [0, 1]. The rest of
    /// the note is silence so repeated pitches stay distinct.
    pub fn with_articulation(mut self, articulation: f64) -> Synth {
        self.articulation = articulation.clamp(0.0, 1.0);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Renders one note, including its articulation gap.
    pub fn render_note(&self, note: &Note) -> Result<SampleBuffer, BufferError> {
        let total = buffer::frame_count(note.duration_seconds, self.sample_rate)?;
        let sounding = if note.is_rest() {
            0
        } else {
            ((total as f64) * self.articulation).round() as usize
        };

        let mut samples = self.oscillate(note.frequency, sounding);
        samples.resize(total, 0);
        SampleBuffer::new(samples, self.sample_rate)
    }

    /// Renders a phrase into one buffer. Fails before rendering anything if
    /// the phrase is longer than the buffer limit.
    pub fn render(&self, notes: &[Note]) -> Result<SampleBuffer, BufferError> {
        notes.iter().try_fold(0, |total, note| {
            let frames = buffer::frame_count(note.duration_seconds, self.sample_rate)?;
            buffer::check_frame_count(total as f64 + frames as f64)
        })?;
        let buffers = notes
            .iter()
            .map(|note| self.render_note(note))
            .collect::<Result<Vec<SampleBuffer>, BufferError>>()?;
        SampleBuffer::concat(&buffers, self.sample_rate)
    }

    /// Renders a plain tone for its full duration, with no articulation gap.
    pub fn tone(&self, frequency: f64, duration_seconds: f64) -> Result<SampleBuffer, BufferError> {
        let count = buffer::frame_count(duration_seconds, self.sample_rate)?;
        SampleBuffer::new(self.oscillate(frequency, count), self.sample_rate)
    }

    fn oscillate(&self, frequency: f64, count: usize) -> Vec<i16> {
        if frequency <= 0.0 {
            return vec![0; count];
        }

        let amplitude = self.volume * f64::from(i16::MAX);
        let rate = f64::from(self.sample_rate);
        (0..count)
            .map(|i| {
                let phase = (frequency * i as f64 / rate).fract();
                (self.waveform.at(phase) * amplitude).round() as i16
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn note(frequency: f64, duration_seconds: f64) -> Note {
        Note {
            frequency,
            duration_seconds,
        }
    }

    fn zero_crossings(samples: &[i16]) -> usize {
        samples
            .windows(2)
            .filter(|pair| (pair[0] < 0) != (pair[1] < 0))
            .count()
    }

    #[test]
    fn test_render_note_length_and_gap() {
        let synth = Synth::new(8000).unwrap();
        let buffer = synth.render_note(&note(440.0, 0.1)).unwrap();

        assert_eq!(buffer.len(), 800);
        assert_eq!(buffer.sample_rate(), 8000);
        assert!(buffer.samples()[720..].iter().all(|&s| s == 0));
        assert!(buffer.samples()[..720].iter().any(|&s| s != 0));
    }

    #[test]
    fn test_sine_frequency() {
        let synth = Synth::new(8000).unwrap().with_articulation(1.0);
        let buffer = synth.render_note(&note(100.0, 1.0)).unwrap();
        // 100 cycles have two crossings each.
        let crossings = zero_crossings(buffer.samples());
        assert!((198..=201).contains(&crossings), "{} crossings", crossings);
    }

    #[test]
    fn test_rest_is_silent() {
        let synth = Synth::new(8000).unwrap();
        let buffer = synth.render_note(&note(0.0, 0.25)).unwrap();
        assert_eq!(buffer.len(), 2000);
        assert!(buffer.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_volume_scales_peak() {
        let synth = Synth::new(8000)
            .unwrap()
            .with_waveform(Waveform::Square)
            .with_volume(0.5);
        let buffer = synth.tone(100.0, 0.1).unwrap();
        let peak = buffer.samples().iter().map(|s| s.unsigned_abs()).max();
        assert_eq!(peak, Some(16384));

        let loud = synth.with_volume(7.0).tone(100.0, 0.1).unwrap();
        assert_eq!(loud.samples()[0], i16::MAX);
    }

    #[test]
    fn test_render_phrase() {
        let synth = Synth::new(8000).unwrap();
        let phrase = synth
            .render(&[note(440.0, 0.1), note(0.0, 0.05), note(220.0, 0.2)])
            .unwrap();
        assert_eq!(phrase.len(), 800 + 400 + 1600);
        assert!(phrase.samples()[800..1200].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_render_is_deterministic() {
        let synth = Synth::new(44100).unwrap().with_waveform(Waveform::Triangle);
        let notes = [note(261.63, 0.05), note(329.63, 0.05)];
        assert_eq!(synth.render(&notes).unwrap(), synth.render(&notes).unwrap());
    }

    #[test]
    fn test_waveform_shapes() {
        assert_eq!(Waveform::Square.at(0.25), 1.0);
        assert_eq!(Waveform::Square.at(0.75), -1.0);
        assert_eq!(Waveform::Triangle.at(0.5), 1.0);
        assert_eq!(Waveform::Triangle.at(0.0), -1.0);
        assert_eq!(Waveform::Saw.at(0.0), -1.0);
        assert!(Waveform::Sine.at(0.0).abs() < 1e-12);
        assert_eq!("Square".parse::<Waveform>().unwrap(), Waveform::Square);
        assert!("noise".parse::<Waveform>().is_err());
    }

    #[test]
    fn test_overlong_notes_rejected() {
        let synth = Synth::new(DEFAULT_SAMPLE_RATE).unwrap();
        let notes = crate::melody::compile("C4:1e30").unwrap();
        assert!(matches!(
            synth.render(&notes),
            Err(BufferError::TooLong { .. })
        ));
        assert!(synth.render_note(&note(440.0, 1e7)).is_err());
        assert!(synth.tone(440.0, 1e30).is_err());

        // Each note fits but the phrase does not.
        assert!(matches!(
            synth.render(&[note(440.0, 1000.0); 4]),
            Err(BufferError::TooLong { .. })
        ));
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert_eq!(Synth::new(0).unwrap_err(), BufferError::ZeroSampleRate);
    }
}

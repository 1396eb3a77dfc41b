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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::melody::{
    synth::{Synth, Waveform, DEFAULT_ARTICULATION, DEFAULT_VOLUME},
    MelodyCompiler, DEFAULT_BPM, DEFAULT_NOTE_SECONDS,
};

/// Melody compiler and synthesis configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Melody {
    /// Tempo for beat-fraction durations (default: 120)
    bpm: Option<f64>,

    /// Duration of notes written without one, e.g. "500ms" (default: 500ms)
    default_duration: Option<String>,

    /// Oscillator shape (default: sine)
    waveform: Option<Waveform>,

    /// Output level from 0 to 1 (default: 0.6)
    volume: Option<f64>,

    /// Fraction of each note that sounds (default: 0.9)
    articulation: Option<f64>,
}

impl Melody {
    /// Returns the tempo. Must be positive.
    pub fn bpm(&self) -> Result<f64, ConfigError> {
        let bpm = self.bpm.unwrap_or(DEFAULT_BPM);
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "melody.bpm",
                reason: format!("{} is not a positive tempo", bpm),
            });
        }
        Ok(bpm)
    }

    /// Returns the default note duration. Must be greater than zero.
    pub fn default_duration(&self) -> Result<Duration, ConfigError> {
        let duration: Duration = match &self.default_duration {
            Some(duration) => DurationString::from_string(duration.clone())
                .map_err(|e| ConfigError::Invalid {
                    field: "melody.default_duration",
                    reason: e.to_string(),
                })?
                .into(),
            None => Duration::from_secs_f64(DEFAULT_NOTE_SECONDS),
        };
        if duration.is_zero() {
            return Err(ConfigError::Invalid {
                field: "melody.default_duration",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(duration)
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform.unwrap_or_default()
    }

    pub fn volume(&self) -> f64 {
        self.volume.unwrap_or(DEFAULT_VOLUME)
    }

    pub fn articulation(&self) -> f64 {
        self.articulation.unwrap_or(DEFAULT_ARTICULATION)
    }

    /// Builds the compiler described by this configuration.
    pub fn compiler(&self) -> Result<MelodyCompiler, ConfigError> {
        Ok(MelodyCompiler::new(
            self.bpm()?,
            self.default_duration()?.as_secs_f64(),
        ))
    }

    /// Builds a synth at the given sample rate with this voice.
    pub fn synth(&self, sample_rate: u32) -> Result<Synth, ConfigError> {
        Ok(Synth::new(sample_rate)
            .map_err(|e| ConfigError::Invalid {
                field: "audio.sample_rate",
                reason: e.to_string(),
            })?
            .with_waveform(self.waveform())
            .with_volume(self.volume())
            .with_articulation(self.articulation()))
    }
}

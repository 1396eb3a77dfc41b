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

//! Linear-interpolation resampling for pitch and rate changes.
//!
//! Every output sample is interpolated between the two nearest source samples
//! rather than duplicated from the nearest one, which keeps low pitches free of
//! stair-step artifacts.

use super::buffer::{BufferError, SampleBuffer, MAX_FRAMES};

/// Tolerance used when deciding whether `len / ratio` is a whole number.
const LENGTH_EPSILON: f64 = 1e-9;

/// Error types for resampling.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ResampleError {
    #[error("Resampling ratio must be positive and finite, got {0}")]
    InvalidRatio(f64),

    #[error("Resampling {len} samples by {ratio} is longer than the {max} sample limit")]
    OutputTooLong { len: usize, ratio: f64, max: usize },

    #[error("Invalid target rate: {0}")]
    Buffer(#[from] BufferError),
}

/// Resamples the buffer by the given ratio.
///
/// A ratio above 1 reads through the source faster (shorter, higher), below 1
/// slower (longer, lower). The output keeps the input's sample rate and has
/// `ceil(len / ratio)` samples.
pub fn resample(input: &SampleBuffer, ratio: f64) -> Result<SampleBuffer, ResampleError> {
    Ok(SampleBuffer::new(
        interpolate(input.samples(), ratio)?,
        input.sample_rate(),
    )?)
}

/// Shifts pitch by the given number of semitones (negative is lower).
pub fn pitch_shift(input: &SampleBuffer, semitones: f64) -> Result<SampleBuffer, ResampleError> {
    resample(input, 2f64.powf(semitones / 12.0))
}

/// Converts the buffer to the target sample rate while keeping its pitch.
pub fn convert_rate(input: &SampleBuffer, target_rate: u32) -> Result<SampleBuffer, ResampleError> {
    if target_rate == 0 {
        return Err(BufferError::ZeroSampleRate.into());
    }
    if target_rate == input.sample_rate() {
        return Ok(input.clone());
    }

    let ratio = f64::from(input.sample_rate()) / f64::from(target_rate);
    Ok(SampleBuffer::new(
        interpolate(input.samples(), ratio)?,
        target_rate,
    )?)
}

/// Returns the number of output samples for the given input length and ratio.
fn output_len(input_len: usize, ratio: f64) -> Result<usize, ResampleError> {
    let exact = input_len as f64 / ratio;
    let rounded = exact.round();
    let len = if (exact - rounded).abs() < LENGTH_EPSILON {
        rounded
    } else {
        exact.ceil()
    };
    if len > MAX_FRAMES as f64 {
        return Err(ResampleError::OutputTooLong {
            len: input_len,
            ratio,
            max: MAX_FRAMES,
        });
    }
    Ok(len as usize)
}

fn interpolate(source: &[i16], ratio: f64) -> Result<Vec<i16>, ResampleError> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(ResampleError::InvalidRatio(ratio));
    }
    if source.is_empty() {
        return Ok(Vec::new());
    }

    let last = source.len() - 1;
    let len = output_len(source.len(), ratio)?;
    let mut output = Vec::with_capacity(len);

    for i in 0..len {
        let x = i as f64 * ratio;
        let x1 = (x.floor() as usize).min(last);
        // Positions past the end hold the last sample.
        let x2 = (x1 + 1).min(last);
        let y1 = f64::from(source[x1]);
        let y2 = f64::from(source[x2]);
        let fraction = x - x1 as f64;

        let y = y1 + (y2 - y1) * fraction;
        output.push(y.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16);
    }

    Ok(output)
}

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
use std::{fmt, sync::Arc, time::Duration};

/// Bit depth of every buffer produced by this crate.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Channel count of every buffer produced by this crate.
pub const CHANNEL_COUNT: u16 = 1;

/// The longest buffer this crate will allocate, about 50 minutes at 44.1kHz.
pub const MAX_FRAMES: usize = 1 << 27;

/// Errors raised while constructing a buffer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("Sample rate must be greater than 0")]
    ZeroSampleRate,

    #[error("cannot join a {0}Hz buffer into a {1}Hz phrase")]
    RateMismatch(u32, u32),

    #[error("{requested} frames is longer than the {max} frame limit")]
    TooLong { requested: u64, max: usize },
}

/// Returns the number of frames spanning the given time at the rate, rounded
/// to the nearest frame.
pub fn frame_count(seconds: f64, sample_rate: u32) -> Result<usize, BufferError> {
    check_frame_count((seconds.max(0.0) * f64::from(sample_rate)).round())
}

/// Checks a frame count computed in floating point against MAX_FRAMES before
/// anything is allocated for it.
pub fn check_frame_count(frames: f64) -> Result<usize, BufferError> {
    if !(0.0..=MAX_FRAMES as f64).contains(&frames) {
        return Err(BufferError::TooLong {
            requested: frames as u64,
            max: MAX_FRAMES,
        });
    }
    Ok(frames as usize)
}

/// An immutable block of mono 16-bit PCM audio.
///
/// Samples are shared behind an Arc so handing a buffer to a device session
/// doesn't copy the audio data. There is no mutating API: every transformation
/// produces a new buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    /// The PCM samples.
    samples: Arc<Vec<i16>>,
    /// Sample rate of the audio data in Hz.
    sample_rate: u32,
}

impl SampleBuffer {
    /// Creates a new buffer. The sample rate must be greater than zero.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Result<SampleBuffer, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }

        Ok(SampleBuffer {
            samples: Arc::new(samples),
            sample_rate,
        })
    }

    /// Creates a buffer from normalized float samples, clamping to [-1.0, 1.0].
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Result<SampleBuffer, BufferError> {
        SampleBuffer::new(
            samples
                .iter()
                .map(|sample| (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
                .collect(),
            sample_rate,
        )
    }

    /// Creates a buffer of silence lasting the given number of samples.
    pub fn silence(len: usize, sample_rate: u32) -> Result<SampleBuffer, BufferError> {
        check_frame_count(len as f64)?;
        SampleBuffer::new(vec![0; len], sample_rate)
    }

    /// Joins buffers end to end. All buffers must share the sample rate.
    pub fn concat(buffers: &[SampleBuffer], sample_rate: u32) -> Result<SampleBuffer, BufferError> {
        let total = check_frame_count(buffers.iter().map(|buffer| buffer.len() as f64).sum())?;
        let mut samples = Vec::with_capacity(total);
        for buffer in buffers {
            if buffer.sample_rate != sample_rate {
                return Err(BufferError::RateMismatch(buffer.sample_rate, sample_rate));
            }
            samples.extend_from_slice(&buffer.samples);
        }
        SampleBuffer::new(samples, sample_rate)
    }

    /// Returns the samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Always mono.
    pub fn channel_count(&self) -> u16 {
        CHANNEL_COUNT
    }

    /// Always 16-bit.
    pub fn bits_per_sample(&self) -> u16 {
        BITS_PER_SAMPLE
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the playback length at the buffer's own rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds())
    }

    /// Returns the playback length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Returns the samples normalized to [-1.0, 1.0].
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&sample| sample as f32 / i16::MAX as f32)
            .collect()
    }
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert_eq!(
            SampleBuffer::new(vec![0, 1, 2], 0),
            Err(BufferError::ZeroSampleRate)
        );
    }

    #[test]
    fn test_duration() {
        let buffer = SampleBuffer::silence(22050, 44100).unwrap();
        assert_eq!(buffer.len(), 22050);
        assert_eq!(buffer.duration(), Duration::from_millis(500));
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.bits_per_sample(), 16);
    }

    #[test]
    fn test_from_f32_clamps() {
        let buffer = SampleBuffer::from_f32(&[0.0, 1.0, -1.0, 2.0, -3.0], 8000).unwrap();
        assert_eq!(
            buffer.samples(),
            &[0, i16::MAX, -i16::MAX, i16::MAX, -i16::MAX]
        );
    }

    #[test]
    fn test_concat() {
        let a = SampleBuffer::new(vec![1, 2], 8000).unwrap();
        let b = SampleBuffer::new(vec![3], 8000).unwrap();
        let joined = SampleBuffer::concat(&[a.clone(), b], 8000).unwrap();
        assert_eq!(joined.samples(), &[1, 2, 3]);

        let other_rate = SampleBuffer::new(vec![4], 44100).unwrap();
        assert_eq!(
            SampleBuffer::concat(&[a, other_rate], 8000),
            Err(BufferError::RateMismatch(44100, 8000))
        );
    }

    #[test]
    fn test_frame_limit() {
        assert_eq!(frame_count(0.5, 44100), Ok(22050));
        assert_eq!(frame_count(-1.0, 44100), Ok(0));
        assert_eq!(check_frame_count(MAX_FRAMES as f64), Ok(MAX_FRAMES));
        assert!(matches!(
            frame_count(1e30, 44100),
            Err(BufferError::TooLong { max: MAX_FRAMES, .. })
        ));
        assert!(frame_count(1e7, 44100).is_err());
        assert!(check_frame_count(f64::INFINITY).is_err());
        assert!(SampleBuffer::silence(MAX_FRAMES + 1, 8000).is_err());
    }
}

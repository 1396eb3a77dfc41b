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
use std::{
    fs::{File, OpenOptions},
    io::{self, BufReader, BufWriter},
    path::Path,
};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, span, Level};

use super::error::{AssetError, ResourceLockError};
use crate::audio::{
    buffer::{BITS_PER_SAMPLE, CHANNEL_COUNT},
    SampleBuffer,
};

fn io_error(path: &Path, source: io::Error) -> AssetError {
    match source.kind() {
        io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied => {
            AssetError::ResourceLock(ResourceLockError {
                path: path.to_path_buf(),
            })
        }
        _ => AssetError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Writes the buffer as a 16-bit mono PCM WAV. The file must not exist yet;
/// an existing or locked file is a ResourceLock error.
pub fn write_wav(buffer: &SampleBuffer, path: &Path) -> Result<(), AssetError> {
    let span = span!(Level::INFO, "write wav");
    let _enter = span.enter();

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| io_error(path, e))?;

    let spec = WavSpec {
        channels: CHANNEL_COUNT,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::new(BufWriter::new(file), spec)?;
    for sample in buffer.samples() {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    debug!(path = %path.display(), samples = buffer.len(), "Wrote WAV.");
    Ok(())
}

/// Reads a WAV file into a mono 16-bit buffer. Multichannel files are
/// downmixed by averaging their channels.
pub fn load_wav(path: &Path) -> Result<SampleBuffer, AssetError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let reader = WavReader::new(BufReader::new(file))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);
    if channels == 0 {
        return Err(AssetError::UnsupportedFormat("no channels".into()));
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let samples = reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|s| to_16_bit(s, bits)))
                .collect::<Result<Vec<i32>, hound::Error>>()?;
            samples
                .chunks(channels)
                .map(|frame| {
                    let sum: i64 = frame.iter().map(|s| i64::from(*s)).sum();
                    (sum as f64 / frame.len() as f64).round() as i16
                })
                .collect::<Vec<i16>>()
        }
        (SampleFormat::Float, 32) => {
            let samples = reader
                .into_samples::<f32>()
                .collect::<Result<Vec<f32>, hound::Error>>()?;
            let mono = samples
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect::<Vec<f32>>();
            return SampleBuffer::from_f32(&mono, spec.sample_rate)
                .map_err(|e| AssetError::UnsupportedFormat(e.to_string()));
        }
        (format, bits) => {
            return Err(AssetError::UnsupportedFormat(format!(
                "{:?} samples at {} bits",
                format, bits
            )))
        }
    };

    SampleBuffer::new(samples, spec.sample_rate)
        .map_err(|e| AssetError::UnsupportedFormat(e.to_string()))
}

/// Scales an integer sample of the given bit depth to the 16-bit range.
fn to_16_bit(sample: i32, bits: u16) -> i32 {
    if bits >= 16 {
        sample >> (bits - 16)
    } else {
        sample << (16 - bits)
    }
}

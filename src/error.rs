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
use crate::{
    audio::{buffer::BufferError, resample::ResampleError, DeviceError},
    config::ConfigError,
    melody::{ParseError, SamplerError},
    monitor::MonitorError,
    session::AssetError,
};

/// Any failure raised by the audio system.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resample(#[from] ResampleError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("audio system has shut down")]
    ShutDown,
}

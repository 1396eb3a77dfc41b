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

/// Error types for device session operations. Device errors are surfaced to the
/// caller as-is; nothing in this crate retries with altered parameters.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no device found with name {0}")]
    NotFound(String),

    #[error("device refused to open session: {0}")]
    Open(String),

    #[error("device rejected buffer format: {0}")]
    Rejected(String),

    #[error("Unsupported device sample format: {0}")]
    UnsupportedFormat(String),

    #[error("device refused to start playback: {0}")]
    Play(String),

    #[error("unable to query playback position: {0}")]
    Position(String),

    #[error("device refused to close session: {0}")]
    Close(String),

    #[error("device did not respond within {0:?}")]
    Timeout(Duration),

    #[error("device session is no longer connected")]
    Disconnected,
}

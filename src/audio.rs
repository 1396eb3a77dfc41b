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
use std::{any::Any, fmt, sync::Arc, time::Duration};

use crate::config;

pub mod buffer;
pub mod cpal;
pub mod error;
pub mod mock;
pub mod resample;

pub use buffer::SampleBuffer;
pub use error::DeviceError;

/// An audio output that can open playback sessions.
///
/// There is deliberately no auto-repeat option on `open`: some drivers reject
/// native looping, so looping is done by the loop monitor restarting sessions.
pub trait Device: Any + fmt::Display + Send + Sync {
    /// Opens a session for the given buffer. The session takes ownership of the
    /// buffer for as long as it is open. The session does not make sound until
    /// `play_from_start` is called.
    fn open(&self, buffer: SampleBuffer) -> Result<Box<dyn Session>, DeviceError>;
}

/// One OS-level playback session. Exactly one session per playback handle.
pub trait Session: Send {
    /// Starts (or restarts) playback at position 0.
    fn play_from_start(&mut self) -> Result<(), DeviceError>;

    /// Returns the elapsed playback position. Holds at the buffer length once
    /// playback reaches the end.
    fn position(&self) -> Result<Duration, DeviceError>;

    /// Closes the session and releases the OS resource. A closed session can
    /// never be used again.
    fn close(self: Box<Self>) -> Result<(), DeviceError>;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, DeviceError> {
    cpal::Device::list()
}

/// Gets a device for the given configuration. Device names starting with
/// "mock" produce a mock device.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, DeviceError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_mock_device() {
        let device = get_device(&config::Audio::new("mock-device")).unwrap();
        assert_eq!(device.to_string(), "mock-device (Mock)");
    }
}

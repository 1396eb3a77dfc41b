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
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tracing::debug;

use crate::audio::{Device, DeviceError, SampleBuffer, Session};

/// Global atomic counter for handle IDs. IDs are never reused.
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Slack when deciding that a session has reached the end of its buffer.
const END_TOLERANCE: Duration = Duration::from_micros(100);

/// Identifies one playback handle for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> HandleId {
        HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a handle. Finished and Stopped are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Created,
    Playing,
    Finished,
    Stopped,
}

/// A snapshot of a live handle.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleInfo {
    pub id: HandleId,
    pub label: String,
    pub loop_requested: bool,
    pub buffer_duration_seconds: f64,
    pub created_at_tick: u64,
    pub last_started_tick: u64,
    pub restarts: u64,
    pub state: PlaybackState,
}

/// One device session plus what the registry needs to know about it.
pub struct PlaybackHandle {
    id: HandleId,
    session: Box<dyn Session>,
    label: String,
    loop_requested: bool,
    buffer_duration: Duration,
    created_at_tick: u64,
    last_started_tick: u64,
    restarts: u64,
    state: PlaybackState,
}

impl PlaybackHandle {
    /// Opens a session on the device. The handle starts out Created.
    pub(super) fn open(
        device: &dyn Device,
        buffer: SampleBuffer,
        loop_requested: bool,
        label: &str,
        tick: u64,
    ) -> Result<PlaybackHandle, DeviceError> {
        let buffer_duration = buffer.duration();
        let session = device.open(buffer)?;
        Ok(PlaybackHandle {
            id: HandleId::next(),
            session,
            label: label.to_string(),
            loop_requested,
            buffer_duration,
            created_at_tick: tick,
            last_started_tick: tick,
            restarts: 0,
            state: PlaybackState::Created,
        })
    }

    /// Plays the session from position 0. Called for the first play and for
    /// every loop restart; the session and ID stay the same.
    pub(super) fn play_from_start(&mut self, tick: u64) -> Result<(), DeviceError> {
        self.session.play_from_start()?;
        if self.state == PlaybackState::Playing {
            self.restarts += 1;
        }
        self.state = PlaybackState::Playing;
        self.last_started_tick = tick;
        Ok(())
    }

    /// Returns true once the session position has reached the buffer length.
    pub(super) fn at_end(&self) -> Result<bool, DeviceError> {
        let position = self.session.position()?;
        Ok(position + END_TOLERANCE >= self.buffer_duration)
    }

    /// Moves the handle into a terminal state and closes its session.
    pub(super) fn close(mut self, state: PlaybackState) -> Result<(), DeviceError> {
        self.state = state;
        debug!(handle = %self.id, label = self.label, state = ?self.state, "Closing handle.");
        self.session.close()
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn loop_requested(&self) -> bool {
        self.loop_requested
    }

    pub fn buffer_duration_seconds(&self) -> f64 {
        self.buffer_duration.as_secs_f64()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Returns a snapshot of the handle.
    pub fn info(&self) -> HandleInfo {
        HandleInfo {
            id: self.id,
            label: self.label.clone(),
            loop_requested: self.loop_requested,
            buffer_duration_seconds: self.buffer_duration_seconds(),
            created_at_tick: self.created_at_tick,
            last_started_tick: self.last_started_tick,
            restarts: self.restarts,
            state: self.state,
        }
    }
}

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
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, info, span, Level};

use super::{DeviceError, SampleBuffer};

/// The time source for mock sessions. Either follows the wall clock or is
/// advanced by hand, which lets tests step through playback deterministically.
#[derive(Clone)]
pub struct MockClock {
    /// Manually advanced time in microseconds, if this is a manual clock.
    manual: Option<Arc<AtomicU64>>,
    /// The origin for wall clock time.
    origin: Instant,
}

impl MockClock {
    /// A clock that follows real time.
    pub fn wall() -> MockClock {
        MockClock {
            manual: None,
            origin: Instant::now(),
        }
    }

    /// A clock that only moves when `advance` is called.
    pub fn manual() -> MockClock {
        MockClock {
            manual: Some(Arc::new(AtomicU64::new(0))),
            origin: Instant::now(),
        }
    }

    /// Moves a manual clock forward. Does nothing for a wall clock.
    pub fn advance(&self, duration: Duration) {
        if let Some(manual) = &self.manual {
            manual.fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
        }
    }

    /// Returns the current time relative to the clock's origin.
    pub fn now(&self) -> Duration {
        match &self.manual {
            Some(manual) => Duration::from_micros(manual.load(Ordering::SeqCst)),
            None => self.origin.elapsed(),
        }
    }
}

/// Records of everything the mock device was asked to do.
#[derive(Default)]
struct MockState {
    next_session_id: u64,
    open_sessions: HashSet<u64>,
    opened: usize,
    closed: Vec<u64>,
    /// Every play command as (session id, clock time).
    plays: Vec<(u64, Duration)>,
    reject_open: bool,
    fail_close: bool,
    fail_restart: bool,
    fail_position: bool,
}

/// A mock device. Doesn't actually play anything.
#[derive(Clone)]
pub struct Device {
    name: String,
    clock: MockClock,
    state: Arc<Mutex<MockState>>,
}

impl Device {
    /// Gets the given mock device, driven by the wall clock.
    pub fn get(name: &str) -> Device {
        Device::with_clock(name, MockClock::wall())
    }

    /// Gets a mock device driven by the given clock.
    pub fn with_clock(name: &str, clock: MockClock) -> Device {
        Device {
            name: name.to_string(),
            clock,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Returns the device's clock.
    pub fn clock(&self) -> &MockClock {
        &self.clock
    }

    /// Makes subsequent opens fail as if the driver refused the format.
    pub fn set_reject_open(&self, reject: bool) {
        self.state.lock().reject_open = reject;
    }

    /// Makes subsequent closes fail. The session is still released.
    pub fn set_fail_close(&self, fail: bool) {
        self.state.lock().fail_close = fail;
    }

    /// Makes play commands on an already started session fail.
    pub fn set_fail_restart(&self, fail: bool) {
        self.state.lock().fail_restart = fail;
    }

    /// Makes position queries fail.
    pub fn set_fail_position(&self, fail: bool) {
        self.state.lock().fail_position = fail;
    }

    /// Returns the number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.state.lock().open_sessions.len()
    }

    /// Returns the number of sessions ever opened.
    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    /// Returns the ids of closed sessions in close order.
    pub fn closed(&self) -> Vec<u64> {
        self.state.lock().closed.clone()
    }

    /// Returns the clock times of every play command issued to the session.
    pub fn play_starts(&self, session_id: u64) -> Vec<Duration> {
        self.state
            .lock()
            .plays
            .iter()
            .filter(|(id, _)| *id == session_id)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Returns the total number of play commands issued.
    pub fn play_count(&self) -> usize {
        self.state.lock().plays.len()
    }
}

impl super::Device for Device {
    fn open(&self, buffer: SampleBuffer) -> Result<Box<dyn super::Session>, DeviceError> {
        let span = span!(Level::INFO, "open session (mock)");
        let _enter = span.enter();

        let mut state = self.state.lock();
        if state.reject_open {
            return Err(DeviceError::Rejected(format!(
                "{}Hz/{}-bit mono",
                buffer.sample_rate(),
                buffer.bits_per_sample()
            )));
        }

        let id = state.next_session_id;
        state.next_session_id += 1;
        state.opened += 1;
        state.open_sessions.insert(id);

        info!(
            device = self.name,
            session = id,
            duration = ?buffer.duration(),
            "Opened session."
        );

        Ok(Box::new(Session {
            id,
            duration: buffer.duration(),
            clock: self.clock.clone(),
            state: self.state.clone(),
            started_at: None,
            _buffer: buffer,
        }))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

/// A mock session. Its position is the clock time since the last play command,
/// held at the buffer length.
pub struct Session {
    id: u64,
    duration: Duration,
    clock: MockClock,
    state: Arc<Mutex<MockState>>,
    started_at: Option<Duration>,
    _buffer: SampleBuffer,
}

impl super::Session for Session {
    fn play_from_start(&mut self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if !state.open_sessions.contains(&self.id) {
            return Err(DeviceError::Disconnected);
        }
        if self.started_at.is_some() && state.fail_restart {
            return Err(DeviceError::Play("parameter not recognized".into()));
        }

        let now = self.clock.now();
        state.plays.push((self.id, now));
        self.started_at = Some(now);
        debug!(session = self.id, at = ?now, "Play from start.");
        Ok(())
    }

    fn position(&self) -> Result<Duration, DeviceError> {
        if self.state.lock().fail_position {
            return Err(DeviceError::Position("status unavailable".into()));
        }

        Ok(match self.started_at {
            Some(started_at) => self
                .clock
                .now()
                .saturating_sub(started_at)
                .min(self.duration),
            None => Duration::ZERO,
        })
    }

    fn close(self: Box<Self>) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.open_sessions.remove(&self.id);
        state.closed.push(self.id);
        debug!(session = self.id, "Closed session.");

        if state.fail_close {
            return Err(DeviceError::Close("driver busy".into()));
        }
        Ok(())
    }
}

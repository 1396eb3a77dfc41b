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

//! The table of live playback handles.
//!
//! Every open device session has exactly one entry here and every entry's
//! session is open. All access goes through one mutex, so starting a sound,
//! stopping it, a monitor tick and the shutdown drain never interleave.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{info, span, warn, Level};

use crate::{
    audio::{Device, DeviceError, SampleBuffer},
    error::AudioError,
    shutdown::ShutdownReport,
};

mod handle;

pub use handle::{HandleId, HandleInfo, PlaybackHandle, PlaybackState};

/// What one monitor tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// The tick number after this poll.
    pub tick: u64,
    /// Looping handles that were played from the start again.
    pub restarted: Vec<HandleId>,
    /// Non-looping handles that reached the end and were removed.
    pub finished: Vec<HandleId>,
    /// Handles removed because their session stopped answering.
    pub failed: Vec<HandleId>,
}

/// What a tick decided for one handle.
enum Action {
    Restart,
    Finish,
    Fail(DeviceError),
}

struct Inner {
    handles: HashMap<HandleId, PlaybackHandle>,
    tick: u64,
    drained: bool,
}

/// The active sound registry.
pub struct SoundRegistry {
    inner: Mutex<Inner>,
}

impl Default for SoundRegistry {
    fn default() -> Self {
        SoundRegistry::new()
    }
}

impl SoundRegistry {
    pub fn new() -> SoundRegistry {
        SoundRegistry {
            inner: Mutex::new(Inner {
                handles: HashMap::new(),
                tick: 0,
                drained: false,
            }),
        }
    }

    /// Opens a session for the buffer, plays it from the start and registers
    /// it. Looping is never requested from the device; the monitor restarts
    /// looping handles itself.
    ///
    /// Once the registry has been drained, the session is closed right after
    /// it opens and this returns ShutDown.
    pub fn start(
        &self,
        device: &dyn Device,
        buffer: SampleBuffer,
        loop_requested: bool,
        label: &str,
    ) -> Result<HandleId, AudioError> {
        let span = span!(Level::INFO, "start playback");
        let _enter = span.enter();

        let mut inner = self.inner.lock();
        let tick = inner.tick;
        let mut handle = PlaybackHandle::open(device, buffer, loop_requested, label, tick)?;

        if inner.drained {
            warn!(label, "Audio system is shut down, closing new session.");
            if let Err(e) = handle.close(PlaybackState::Stopped) {
                warn!(label, err = %e, "Error closing session after shutdown.");
            }
            return Err(AudioError::ShutDown);
        }

        if let Err(e) = handle.play_from_start(tick) {
            warn!(label, err = %e, "First play failed, closing session.");
            if let Err(close_err) = handle.close(PlaybackState::Stopped) {
                warn!(label, err = %close_err, "Error closing session.");
            }
            return Err(e.into());
        }

        let id = handle.id();
        info!(
            handle = %id,
            label,
            device = %device,
            looping = loop_requested,
            duration = handle.buffer_duration_seconds(),
            "Started playback."
        );
        inner.handles.insert(id, handle);
        Ok(id)
    }

    /// Stops the handle and closes its session. Returns false if the handle is
    /// no longer registered. The entry is removed even if the close fails.
    pub fn stop(&self, id: HandleId) -> Result<bool, DeviceError> {
        let mut inner = self.inner.lock();
        let handle = match inner.handles.remove(&id) {
            Some(handle) => handle,
            None => return Ok(false),
        };

        info!(handle = %id, label = handle.label(), "Stopping playback.");
        handle.close(PlaybackState::Stopped)?;
        Ok(true)
    }

    /// Runs one monitor tick: restarts looping handles that reached the end
    /// and removes the rest once they finish. A handle whose position can't be
    /// read or that can't be restarted is closed and removed.
    pub fn poll(&self) -> PollReport {
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let mut report = PollReport {
            tick,
            ..PollReport::default()
        };

        let mut done: Vec<(HandleId, PlaybackState)> = Vec::new();
        for (id, handle) in inner.handles.iter_mut() {
            let action = match handle.at_end() {
                Ok(false) => continue,
                Ok(true) if handle.loop_requested() => Action::Restart,
                Ok(true) => Action::Finish,
                Err(e) => Action::Fail(e),
            };

            match action {
                Action::Restart => match handle.play_from_start(tick) {
                    Ok(()) => report.restarted.push(*id),
                    Err(e) => {
                        warn!(handle = %id, label = handle.label(), err = %e, "Unable to restart loop.");
                        report.failed.push(*id);
                        done.push((*id, PlaybackState::Finished));
                    }
                },
                Action::Finish => {
                    report.finished.push(*id);
                    done.push((*id, PlaybackState::Finished));
                }
                Action::Fail(e) => {
                    warn!(handle = %id, label = handle.label(), err = %e, "Unable to query position.");
                    report.failed.push(*id);
                    done.push((*id, PlaybackState::Finished));
                }
            }
        }

        for (id, state) in done {
            if let Some(handle) = inner.handles.remove(&id) {
                info!(handle = %id, label = handle.label(), "Playback finished.");
                if let Err(e) = handle.close(state) {
                    warn!(handle = %id, err = %e, "Error closing finished session.");
                }
            }
        }

        report
    }

    /// Closes and removes every handle regardless of loop state, then refuses
    /// all later starts. Close errors are logged and counted; the drain always
    /// completes. A second drain reports nothing.
    pub fn drain(&self) -> ShutdownReport {
        let span = span!(Level::INFO, "drain registry");
        let _enter = span.enter();

        let mut inner = self.inner.lock();
        inner.drained = true;

        let mut report = ShutdownReport::default();
        for (id, handle) in inner.handles.drain() {
            match handle.close(PlaybackState::Stopped) {
                Ok(()) => report.closed += 1,
                Err(e) => {
                    warn!(handle = %id, err = %e, "Error closing session during shutdown.");
                    report.failed += 1;
                }
            }
        }

        info!(
            closed = report.closed,
            failed = report.failed,
            "Drained sound registry."
        );
        report
    }

    /// Returns true if the handle is still registered.
    pub fn is_active(&self, id: HandleId) -> bool {
        self.inner.lock().handles.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().handles.is_empty()
    }

    /// Returns true once the registry has been drained.
    pub fn is_drained(&self) -> bool {
        self.inner.lock().drained
    }

    /// Returns the number of monitor ticks so far.
    pub fn current_tick(&self) -> u64 {
        self.inner.lock().tick
    }

    /// Returns a snapshot of every live handle, ordered by ID.
    pub fn snapshot(&self) -> Vec<HandleInfo> {
        let mut infos: Vec<HandleInfo> = self
            .inner
            .lock()
            .handles
            .values()
            .map(|handle| handle.info())
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;
    use crate::audio::mock::{self, MockClock};

    /// One tick at 60 Hz.
    const TICK: Duration = Duration::from_micros(16_667);

    fn manual_device() -> mock::Device {
        mock::Device::with_clock("mock", MockClock::manual())
    }

    fn buffer(millis: u64) -> SampleBuffer {
        SampleBuffer::silence((millis * 8) as usize, 8000).unwrap()
    }

    #[test]
    fn test_start_and_stop() {
        let device = manual_device();
        let registry = SoundRegistry::new();

        let id = registry.start(&device, buffer(100), false, "bounce").unwrap();
        assert!(registry.is_active(id));
        assert_eq!(registry.len(), 1);
        assert_eq!(device.open_sessions(), 1);
        assert_eq!(device.play_count(), 1);

        let info = &registry.snapshot()[0];
        assert_eq!(info.id, id);
        assert_eq!(info.label, "bounce");
        assert_eq!(info.state, PlaybackState::Playing);
        assert!(!info.loop_requested);

        assert!(registry.stop(id).unwrap());
        assert!(!registry.is_active(id));
        assert!(registry.is_empty());
        assert_eq!(device.open_sessions(), 0);

        // Stopping again is a no-op.
        assert!(!registry.stop(id).unwrap());
    }

    #[test]
    fn test_stop_removes_even_when_close_fails() {
        let device = manual_device();
        let registry = SoundRegistry::new();
        let id = registry.start(&device, buffer(100), true, "music").unwrap();

        device.set_fail_close(true);
        assert!(registry.stop(id).is_err());
        assert!(!registry.is_active(id));
        assert_eq!(device.open_sessions(), 0);
    }

    #[test]
    fn test_open_failure_leaves_no_entry() {
        let device = manual_device();
        device.set_reject_open(true);
        let registry = SoundRegistry::new();

        let err = registry.start(&device, buffer(100), true, "music").unwrap_err();
        assert!(matches!(err, AudioError::Device(DeviceError::Rejected(_))));
        assert!(registry.is_empty());
        assert_eq!(device.open_sessions(), 0);
    }

    #[test]
    fn test_non_looping_finishes() {
        let device = manual_device();
        let registry = SoundRegistry::new();
        let id = registry.start(&device, buffer(50), false, "bounce").unwrap();

        let mut ticks = 0;
        while registry.is_active(id) {
            device.clock().advance(TICK);
            let report = registry.poll();
            ticks += 1;
            assert!(report.restarted.is_empty());
            if !report.finished.is_empty() {
                assert_eq!(report.finished, vec![id]);
            }
            assert!(ticks < 10, "handle never finished");
        }

        // 50ms is reached on the third 16.7ms tick.
        assert_eq!(ticks, 3);
        assert_eq!(device.open_sessions(), 0);
        assert_eq!(device.play_count(), 1);
        assert_eq!(registry.current_tick(), 3);
    }

    #[test]
    fn test_loop_gap_within_one_tick() {
        let device = manual_device();
        let registry = SoundRegistry::new();
        let length = Duration::from_millis(100);
        let id = registry.start(&device, buffer(100), true, "music").unwrap();

        for _ in 0..120 {
            device.clock().advance(TICK);
            let report = registry.poll();
            assert!(report.finished.is_empty());
            assert!(report.failed.is_empty());
        }

        assert!(registry.is_active(id));
        let starts = device.play_starts(0);
        assert!(starts.len() > 10);
        for pair in starts.windows(2) {
            let gap = pair[1].saturating_sub(pair[0] + length);
            assert!(gap <= TICK, "gap {:?} exceeds one tick", gap);
        }

        let info = &registry.snapshot()[0];
        assert_eq!(info.restarts, starts.len() as u64 - 1);
        // Same session the whole way through.
        assert_eq!(device.opened(), 1);
    }

    #[test]
    fn test_failed_restart_removes_handle() {
        let device = manual_device();
        let registry = SoundRegistry::new();
        let id = registry.start(&device, buffer(10), true, "music").unwrap();

        device.set_fail_restart(true);
        device.clock().advance(TICK);
        let report = registry.poll();
        assert_eq!(report.failed, vec![id]);
        assert!(!registry.is_active(id));
        assert_eq!(device.open_sessions(), 0);
    }

    #[test]
    fn test_failed_position_removes_handle() {
        let device = manual_device();
        let registry = SoundRegistry::new();
        let looping = registry.start(&device, buffer(100), true, "music").unwrap();
        let oneshot = registry.start(&device, buffer(100), false, "bounce").unwrap();

        device.set_fail_position(true);
        let mut report = registry.poll();
        report.failed.sort();
        assert_eq!(report.failed, vec![looping, oneshot]);
        assert!(registry.is_empty());
        assert_eq!(device.open_sessions(), 0);
    }

    #[test]
    fn test_drain_closes_everything() {
        let device = manual_device();
        let registry = SoundRegistry::new();
        for i in 0..5 {
            registry
                .start(&device, buffer(100), i % 2 == 0, "sound")
                .unwrap();
        }

        device.set_fail_close(true);
        let report = registry.drain();
        assert_eq!(report.closed, 0);
        assert_eq!(report.failed, 5);
        assert!(registry.is_empty());
        assert_eq!(device.open_sessions(), 0);
        assert_eq!(device.closed().len(), 5);

        assert_eq!(registry.drain(), ShutdownReport::default());
    }

    #[test]
    fn test_start_after_drain() {
        let device = manual_device();
        let registry = SoundRegistry::new();
        registry.drain();

        let err = registry.start(&device, buffer(100), true, "music").unwrap_err();
        assert!(matches!(err, AudioError::ShutDown));
        assert!(registry.is_empty());
        assert_eq!(device.opened(), 1);
        assert_eq!(device.open_sessions(), 0);
        assert_eq!(device.play_count(), 0);
    }

    #[test]
    fn test_concurrent_start_and_drain() {
        let device = Arc::new(mock::Device::get("mock"));
        let registry = Arc::new(SoundRegistry::new());

        let starters: Vec<_> = (0..4)
            .map(|_| {
                let device = device.clone();
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let _ = registry.start(device.as_ref(), buffer(100), true, "music");
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(5));
        registry.drain();
        for starter in starters {
            starter.join().unwrap();
        }

        assert!(registry.is_empty());
        assert_eq!(device.open_sessions(), 0);
        assert_eq!(device.opened(), device.closed().len());
    }
}

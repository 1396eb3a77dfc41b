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
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, info, span, trace, Level};

use crate::registry::SoundRegistry;

pub mod thread_priority;

/// Default polling rate.
pub const DEFAULT_RATE_HZ: f64 = 60.0;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Monitor rate must be positive and finite, got {0}")]
    InvalidRate(f64),

    #[error("Unable to spawn monitor thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Polls the registry at a fixed rate on its own thread, restarting looping
/// sounds and retiring finished ones.
pub struct LoopMonitor {
    rate_hz: f64,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl LoopMonitor {
    /// Spawns the monitor thread.
    pub fn spawn(registry: Arc<SoundRegistry>, rate_hz: f64) -> Result<LoopMonitor, MonitorError> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(MonitorError::InvalidRate(rate_hz));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let tick = Duration::from_secs(1).div_f64(rate_hz);
        let thread = {
            let stop = stop.clone();
            thread::Builder::new()
                .name("looptone-monitor".into())
                .spawn(move || run(registry, tick, stop))?
        };

        info!(rate_hz, "Started loop monitor.");
        Ok(LoopMonitor {
            rate_hz,
            stop,
            thread: Some(thread),
        })
    }

    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }

    /// Returns true until the monitor has been stopped.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Stops the monitor and waits for its thread to exit. Safe to call more
    /// than once.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.stop.store(true, Ordering::Release);
        if thread.join().is_err() {
            debug!("Loop monitor thread panicked.");
        }
        info!("Stopped loop monitor.");
    }
}

impl Drop for LoopMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The monitor loop. Deadlines are absolute so the cadence never drifts; if a
/// poll overruns, the missed deadlines are dropped instead of run back to back.
fn run(registry: Arc<SoundRegistry>, tick: Duration, stop: Arc<AtomicBool>) {
    let span = span!(Level::INFO, "loop monitor");
    let _enter = span.enter();

    thread_priority::configure_monitor_thread_priority(
        thread_priority::monitor_thread_priority(),
        thread_priority::rt_monitor_enabled(),
    );

    let mut deadline = Instant::now() + tick;
    loop {
        spin_sleep::sleep(deadline.saturating_duration_since(Instant::now()));
        if stop.load(Ordering::Acquire) {
            return;
        }

        let report = registry.poll();
        if !report.restarted.is_empty() || !report.finished.is_empty() || !report.failed.is_empty()
        {
            trace!(
                tick = report.tick,
                restarted = report.restarted.len(),
                finished = report.finished.len(),
                failed = report.failed.len(),
                "Monitor tick."
            );
        }

        deadline += tick;
        let now = Instant::now();
        if deadline < now {
            let behind = (now - deadline).as_secs_f64() / tick.as_secs_f64();
            let missed = behind.floor() as u32 + 1;
            deadline += tick * missed;
            debug!(missed, "Loop monitor fell behind, skipping ticks.");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        audio::{mock, SampleBuffer},
        testutil::eventually,
    };

    #[test]
    fn test_invalid_rate() {
        let registry = Arc::new(SoundRegistry::new());
        for rate in [0.0, -60.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                LoopMonitor::spawn(registry.clone(), rate),
                Err(MonitorError::InvalidRate(_))
            ));
        }
    }

    #[test]
    fn test_monitor_finishes_and_loops() {
        let device = mock::Device::get("mock");
        let registry = Arc::new(SoundRegistry::new());
        let mut monitor = LoopMonitor::spawn(registry.clone(), DEFAULT_RATE_HZ).unwrap();
        assert!(monitor.is_running());

        let buffer = SampleBuffer::silence(160, 8000).unwrap();
        let oneshot = registry.start(&device, buffer.clone(), false, "bounce").unwrap();
        let looping = registry.start(&device, buffer, true, "music").unwrap();

        eventually(|| !registry.is_active(oneshot), "One-shot sound never finished");
        eventually(
            || {
                registry
                    .snapshot()
                    .iter()
                    .any(|info| info.id == looping && info.restarts >= 2)
            },
            "Looping sound never restarted",
        );
        assert!(registry.is_active(looping));

        monitor.stop();
        assert!(!monitor.is_running());
        let tick = registry.current_tick();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(registry.current_tick(), tick);

        // Stopping again does nothing.
        monitor.stop();
        registry.drain();
        assert_eq!(device.open_sessions(), 0);
    }

    #[test]
    fn test_monitor_cadence() {
        let registry = Arc::new(SoundRegistry::new());
        let mut monitor = LoopMonitor::spawn(registry.clone(), 100.0).unwrap();
        thread::sleep(Duration::from_millis(500));
        monitor.stop();

        // Roughly 50 ticks; leave room for a loaded test machine.
        let ticks = registry.current_tick();
        assert!((20..=55).contains(&ticks), "{} ticks", ticks);
    }
}

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
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, span, Level};

use crate::{monitor::LoopMonitor, registry::SoundRegistry};

/// The outcome of a shutdown drain. `closed` counts sessions that closed
/// cleanly and `failed` those whose close reported an error. Both kinds are
/// removed from the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub closed: usize,
    pub failed: usize,
}

impl ShutdownReport {
    /// Total number of sessions released.
    pub fn total(&self) -> usize {
        self.closed + self.failed
    }
}

/// Tears down all playback when the host goes away.
pub struct ShutdownCoordinator {
    registry: Arc<SoundRegistry>,
    monitor: Mutex<Option<LoopMonitor>>,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<SoundRegistry>, monitor: Option<LoopMonitor>) -> ShutdownCoordinator {
        ShutdownCoordinator {
            registry,
            monitor: Mutex::new(monitor),
        }
    }

    /// Drains the registry, then stops the loop monitor. Returns once every
    /// session has been closed. Later calls report nothing.
    pub fn on_host_shutdown_signal(&self) -> ShutdownReport {
        let span = span!(Level::INFO, "host shutdown");
        let _enter = span.enter();

        let report = self.registry.drain();
        if let Some(mut monitor) = self.monitor.lock().take() {
            monitor.stop();
        }

        info!(
            closed = report.closed,
            failed = report.failed,
            "Audio shutdown complete."
        );
        report
    }

    /// Returns true once a shutdown has run.
    pub fn is_shut_down(&self) -> bool {
        self.registry.is_drained()
    }
}

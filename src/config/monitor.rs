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
use serde::Deserialize;

use crate::monitor::DEFAULT_RATE_HZ;

/// Loop monitor configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Monitor {
    /// Whether to run the monitor thread. Hosts that poll from their own frame
    /// tick turn this off.
    enabled: Option<bool>,

    /// Polling rate in Hz (default: 60)
    rate_hz: Option<f64>,
}

impl Monitor {
    pub fn new(enabled: bool, rate_hz: f64) -> Monitor {
        Monitor {
            enabled: Some(enabled),
            rate_hz: Some(rate_hz),
        }
    }

    /// Returns whether the monitor thread runs (default: true)
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Returns the polling rate (default: 60)
    pub fn rate_hz(&self) -> f64 {
        self.rate_hz.unwrap_or(DEFAULT_RATE_HZ)
    }
}

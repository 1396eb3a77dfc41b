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

//! A small real-time audio subsystem for window-driven hosts.
//!
//! Scores are compiled into notes and synthesized into PCM buffers, buffers
//! are resampled for pitch and rate changes, and playback goes through device
//! sessions tracked in a single registry. Looping is done in software by a
//! fixed-rate monitor, and the whole registry is drained when the host
//! window goes away.

pub mod audio;
pub mod config;
pub mod error;
pub mod melody;
pub mod monitor;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod system;
#[cfg(test)]
mod testutil;
pub mod util;

pub use error::AudioError;
pub use system::{AudioSystem, HostEvent};

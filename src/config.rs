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
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;

mod assets;
mod audio;
mod error;
mod melody;
mod monitor;

pub use assets::Assets;
pub use audio::{Audio, DEFAULT_DEVICE};
pub use error::ConfigError;
pub use melody::Melody;
pub use monitor::Monitor;

/// The configuration for the audio system. Every section is optional.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SystemConfig {
    #[serde(default)]
    audio: Audio,
    #[serde(default)]
    melody: Melody,
    #[serde(default)]
    monitor: Monitor,
    #[serde(default)]
    assets: Assets,
}

impl SystemConfig {
    /// Creates a configuration from its sections.
    pub fn new(audio: Audio, melody: Melody, monitor: Monitor, assets: Assets) -> SystemConfig {
        SystemConfig {
            audio,
            melody,
            monitor,
            assets,
        }
    }

    /// Parse a configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<SystemConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<SystemConfig>()?)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn melody(&self) -> &Melody {
        &self.melody
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }
}

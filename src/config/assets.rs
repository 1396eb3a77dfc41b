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
use std::path::PathBuf;

use serde::Deserialize;

/// Where persisted assets are written.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Assets {
    directory: Option<String>,
}

impl Assets {
    pub fn new(directory: &str) -> Assets {
        Assets {
            directory: Some(directory.to_string()),
        }
    }

    /// Returns the asset directory (default: the working directory)
    pub fn directory(&self) -> PathBuf {
        PathBuf::from(self.directory.as_deref().unwrap_or("."))
    }
}

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
use std::{io, path::PathBuf};

/// The target file already exists or is held by someone else.
#[derive(Debug, thiserror::Error)]
#[error("asset {} is locked or already exists", path.display())]
pub struct ResourceLockError {
    pub path: PathBuf,
}

/// Errors raised while writing or reading audio assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    ResourceLock(#[from] ResourceLockError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported WAV format: {0}")]
    UnsupportedFormat(String),
}

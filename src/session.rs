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

//! Per-run asset naming and persistence.
//!
//! Every file written by a run carries the run id, so two concurrent runs
//! never contend for the same file.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        OnceLock,
    },
};

use tracing::info;

use crate::audio::SampleBuffer;

mod error;
mod wav;

pub use error::{AssetError, ResourceLockError};
pub use wav::{load_wav, write_wav};

/// Default asset extension.
pub const DEFAULT_EXTENSION: &str = "wav";

/// The namer for this process, created on first use.
static PROCESS_NAMER: OnceLock<SessionNamer> = OnceLock::new();

/// Random salt for run ids in this process.
static RUN_SALT: OnceLock<u32> = OnceLock::new();

/// Counter that keeps namers created in the same process distinct.
static NAMER_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Produces collision-free asset names of the form `<base>_<run id>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNamer {
    run_id: u64,
    extension: String,
}

impl Default for SessionNamer {
    fn default() -> Self {
        SessionNamer::new()
    }
}

impl SessionNamer {
    /// Creates a namer with a fresh run id. The high half is the process id
    /// and the low half is a random salt offset by a per-process counter.
    pub fn new() -> SessionNamer {
        let salt = *RUN_SALT.get_or_init(rand::random::<u32>);
        SessionNamer::with_run_id(run_id(
            std::process::id(),
            salt,
            NAMER_COUNTER.fetch_add(1, Ordering::Relaxed),
        ))
    }

    /// Returns the namer shared by the whole process. Its run id never changes.
    pub fn process() -> &'static SessionNamer {
        PROCESS_NAMER.get_or_init(SessionNamer::new)
    }

    /// Creates a namer with a fixed run id.
    pub fn with_run_id(run_id: u64) -> SessionNamer {
        SessionNamer {
            run_id,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Uses a different file extension.
    pub fn with_extension(mut self, extension: &str) -> SessionNamer {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the file name for the given base. The same base always yields
    /// the same name within a run.
    pub fn next_asset_name(&self, base: &str) -> String {
        format!("{}_{:016x}.{}", base, self.run_id, self.extension)
    }

    /// Returns the path of the named asset inside the directory.
    pub fn asset_path(&self, directory: &Path, base: &str) -> PathBuf {
        directory.join(self.next_asset_name(base))
    }

    /// Writes the buffer as a WAV under the run's name for the base. Fails with
    /// a ResourceLock error if that file already exists or is held.
    pub fn persist(
        &self,
        buffer: &SampleBuffer,
        directory: &Path,
        base: &str,
    ) -> Result<PathBuf, AssetError> {
        let path = self.asset_path(directory, base);
        write_wav(buffer, &path)?;
        info!(
            path = %path.display(),
            duration = ?buffer.duration(),
            "Persisted asset."
        );
        Ok(path)
    }
}

/// Builds a run id from the process id, the process's salt and the namer
/// counter. Runs differ in pid or salt; namers within a run differ in counter.
fn run_id(pid: u32, salt: u32, counter: u32) -> u64 {
    (u64::from(pid) << 32) | u64::from(salt.wrapping_add(counter))
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_name_format() {
        let namer = SessionNamer::with_run_id(0xabc);
        assert_eq!(namer.next_asset_name("bounce"), "bounce_0000000000000abc.wav");
        assert_eq!(
            namer.next_asset_name("bounce"),
            namer.next_asset_name("bounce")
        );

        let namer = namer.with_extension(".raw");
        assert_eq!(namer.next_asset_name("music"), "music_0000000000000abc.raw");
        assert_eq!(
            namer.asset_path(Path::new("/tmp/assets"), "music"),
            PathBuf::from("/tmp/assets/music_0000000000000abc.raw")
        );
    }

    #[test]
    fn test_process_namer_is_stable() {
        let first = SessionNamer::process();
        let second = SessionNamer::process();
        assert_eq!(first.run_id(), second.run_id());
        assert_eq!(first.run_id() >> 32, u64::from(std::process::id()));
    }

    #[test]
    fn test_rapid_namers_are_distinct() {
        let names: HashSet<String> = (0..1000)
            .map(|_| SessionNamer::new().next_asset_name("music"))
            .collect();
        assert_eq!(names.len(), 1000);
    }

    #[test]
    fn test_runs_are_distinct() {
        let name =
            |pid, salt| SessionNamer::with_run_id(run_id(pid, salt, 0)).next_asset_name("music");

        // A reused pid gets a new salt.
        assert_ne!(name(4242, 1), name(4242, 2));
        // Concurrent processes that draw the same salt differ in pid.
        assert_ne!(name(4242, 7), name(4243, 7));
        assert_eq!(name(4242, 7), name(4242, 7));

        assert_eq!(run_id(1, 2, 3), 0x0000_0001_0000_0005);
        assert_eq!(run_id(1, u32::MAX, 1), 0x0000_0001_0000_0000);
    }

    #[test]
    fn test_persist_collision() {
        let dir = tempfile::tempdir().unwrap();
        let namer = SessionNamer::with_run_id(7);
        let buffer = SampleBuffer::new(vec![1, 2, 3], 8000).unwrap();

        let path = namer.persist(&buffer, dir.path(), "bounce").unwrap();
        assert_eq!(path, dir.path().join("bounce_0000000000000007.wav"));
        assert_eq!(load_wav(&path).unwrap(), buffer);

        // A second write under the same run never picks another name.
        let err = namer.persist(&buffer, dir.path(), "bounce").unwrap_err();
        assert!(matches!(err, AssetError::ResourceLock(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // Another run writes alongside without contention.
        SessionNamer::with_run_id(8)
            .persist(&buffer, dir.path(), "bounce")
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}

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
use std::time::Duration;

/// Extracts the base name of a score file for naming its rendered asset.
pub fn asset_base_name(path: &Path) -> &str {
    path.file_stem()
        .and_then(|f| f.to_str())
        .filter(|f| !f.is_empty())
        .unwrap_or("melody")
}

/// Outputs the given duration in a minutes:seconds.millis format.
pub fn duration_minutes_seconds(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    let secs = duration.as_secs() - minutes * 60;
    format!("{}:{:02}.{:03}", minutes, secs, duration.subsec_millis())
}

#[cfg(test)]
mod test {
    use std::path::Path;
    use std::time::Duration;

    use crate::util::{asset_base_name, duration_minutes_seconds};

    #[test]
    fn test_duration_minutes_strings() {
        assert_eq!("0:00.000", duration_minutes_seconds(Duration::new(0, 0)));
        assert_eq!("0:00.250", duration_minutes_seconds(Duration::from_millis(250)));
        assert_eq!("0:55.000", duration_minutes_seconds(Duration::new(55, 0)));
        assert_eq!("2:05.500", duration_minutes_seconds(Duration::from_millis(125_500)));
    }

    #[test]
    fn test_asset_base_name() {
        assert_eq!("theme", asset_base_name(Path::new("scores/theme.txt")));
        assert_eq!("bounce", asset_base_name(Path::new("bounce")));
        assert_eq!("melody", asset_base_name(Path::new("/")));
    }
}

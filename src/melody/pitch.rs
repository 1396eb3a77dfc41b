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
use super::error::ParseErrorKind;

/// Tokens that mean "no sound for this duration".
pub const SILENCE_MARKERS: &[&str] = &["p", "r", "rest", "-"];

/// Reference tuning.
const A4_FREQUENCY: f64 = 440.0;
const A4_MIDI_NOTE: i32 = 69;
const MAX_OCTAVE: i32 = 8;

/// Returns the equal-temperament frequency of a note name like "C4", "F#3" or
/// "Bb5". Octaves run from 0 to 8.
pub fn note_frequency(name: &str) -> Option<f64> {
    let mut chars = name.chars();
    let semitone = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave) = match rest.as_bytes().first()? {
        b'#' => (1, &rest[1..]),
        b'b' => (-1, &rest[1..]),
        _ => (0, rest),
    };

    if octave.is_empty() || !octave.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let octave: i32 = octave.parse().ok()?;
    if octave > MAX_OCTAVE {
        return None;
    }

    let midi = (octave + 1) * 12 + semitone + accidental;
    Some(A4_FREQUENCY * 2f64.powf(f64::from(midi - A4_MIDI_NOTE) / 12.0))
}

/// Parses the pitch half of a token into a frequency in Hz. Silence is 0.
pub fn parse_pitch(text: &str) -> Result<f64, ParseErrorKind> {
    if text.is_empty() {
        return Err(ParseErrorKind::Empty);
    }
    if SILENCE_MARKERS
        .iter()
        .any(|marker| marker.eq_ignore_ascii_case(text))
    {
        return Ok(0.0);
    }

    match text.as_bytes()[0] {
        b'0'..=b'9' | b'.' | b'-' | b'+' => match text.parse::<f64>() {
            Ok(frequency) if frequency.is_finite() && frequency >= 0.0 => Ok(frequency),
            _ => Err(ParseErrorKind::InvalidFrequency),
        },
        _ => note_frequency(text).ok_or(ParseErrorKind::InvalidPitch),
    }
}

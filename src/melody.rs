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

//! Melody compilation: text score to notes, notes to PCM.
//!
//! This module provides:
//! - Tokenizing and sanitizing of scores
//! - Pitch names, frequency literals and rests
//! - Durations in seconds or in beat fractions at a tempo
//! - Waveform synthesis into sample buffers
//! - Playing scores on a recorded sample

mod error;
mod parser;
mod pitch;
pub mod sampler;
pub mod synth;

pub use error::{ParseError, ParseErrorKind};
pub use parser::{sanitize_token, tokenize, Token};
pub use pitch::{note_frequency, SILENCE_MARKERS};
pub use sampler::{Sampler, SamplerError};
pub use synth::{Synth, Waveform};

/// Default tempo for beat-fraction durations.
pub const DEFAULT_BPM: f64 = 120.0;

/// Default duration for tokens without one, in seconds.
pub const DEFAULT_NOTE_SECONDS: f64 = 0.5;

/// One note of a compiled melody. A frequency of 0 is a rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub frequency: f64,
    pub duration_seconds: f64,
}

impl Note {
    /// Returns true if the note is silence.
    pub fn is_rest(&self) -> bool {
        self.frequency == 0.0
    }
}

/// Compiles text scores into notes.
#[derive(Debug, Clone, Copy)]
pub struct MelodyCompiler {
    bpm: f64,
    default_duration: f64,
}

impl Default for MelodyCompiler {
    fn default() -> Self {
        MelodyCompiler::new(DEFAULT_BPM, DEFAULT_NOTE_SECONDS)
    }
}

impl MelodyCompiler {
    /// Creates a compiler with the given tempo and default note duration.
    pub fn new(bpm: f64, default_duration: f64) -> MelodyCompiler {
        MelodyCompiler {
            bpm,
            default_duration,
        }
    }

    /// Returns the tempo.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Returns the default note duration in seconds.
    pub fn default_duration(&self) -> f64 {
        self.default_duration
    }

    /// Compiles a score into notes in input order. Fails on the first
    /// malformed token; bad tokens are never skipped.
    pub fn compile(&self, score: &str) -> Result<Vec<Note>, ParseError> {
        parser::parse_score(score, self.bpm, self.default_duration)
    }
}

/// Compiles a score with the default tempo and note duration.
pub fn compile(score: &str) -> Result<Vec<Note>, ParseError> {
    MelodyCompiler::default().compile(score)
}

/// Returns the total length of the notes in seconds.
pub fn total_duration(notes: &[Note]) -> f64 {
    notes.iter().map(|note| note.duration_seconds).sum()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_compile_example_score() {
        let notes = compile("(A4) C4:0.5  (  G4 )").unwrap();

        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].frequency, note_frequency("A4").unwrap());
        assert_eq!(notes[0].duration_seconds, DEFAULT_NOTE_SECONDS);
        assert_eq!(notes[1].frequency, note_frequency("C4").unwrap());
        assert_eq!(notes[1].duration_seconds, 0.5);
        assert_eq!(notes[2].frequency, note_frequency("G4").unwrap());
        assert_eq!(notes[2].duration_seconds, DEFAULT_NOTE_SECONDS);
    }

    #[test]
    fn test_compile_preserves_order_and_timing() {
        let compiler = MelodyCompiler::new(120.0, 0.25);
        let score = "C4:0.1 D4 E4_1/8 p:0.3 440:0.05 (G4_1/1)";
        let notes = compiler.compile(score).unwrap();
        let expected = [0.1, 0.25, 0.25, 0.3, 0.05, 2.0];

        assert_eq!(notes.len(), expected.len());
        let mut elapsed = 0.0;
        for (i, note) in notes.iter().enumerate() {
            assert_eq!(note.duration_seconds, expected[i]);
            elapsed += note.duration_seconds;
            assert!((total_duration(&notes[..=i]) - elapsed).abs() < 1e-12);
        }
        assert!(notes[3].is_rest());
        assert_eq!(notes[4].frequency, 440.0);
    }

    #[test]
    fn test_compile_original_engine_score() {
        let compiler = MelodyCompiler::new(180.0, DEFAULT_NOTE_SECONDS);
        let notes = compiler
            .compile("(C4_1/4, E4_1/4, G4_1/2, C5_1/4, G4_1/4, E4_1/2)")
            .unwrap();
        assert_eq!(notes.len(), 6);
        assert!((notes[0].duration_seconds - 1.0 / 3.0).abs() < 1e-12);
        assert!((notes[2].duration_seconds - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_compile_reports_offending_token() {
        let err = compile("C4 (D4:0.5) E4:zero F4").unwrap_err();
        assert_eq!(err.token, "E4:zero");
        assert_eq!(err.index, 2);
        assert_eq!(err.offset, 12);
        assert_eq!(err.kind, ParseErrorKind::InvalidDuration);
    }

    #[test]
    fn test_compile_rejects_zero_duration() {
        let err = compile("A4 B4:0").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ZeroDuration);
        assert_eq!(err.index, 1);
    }

    #[test]
    fn test_compile_silence() {
        let notes = compile("0:0.5 rest R:1/4").unwrap();
        assert!(notes.iter().all(Note::is_rest));
    }

    #[test]
    fn test_compile_empty() {
        assert!(compile("").unwrap().is_empty());
        assert!(compile(" ( ) ").unwrap().is_empty());
    }
}

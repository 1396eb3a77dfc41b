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

//! Tokenizer and token parser for the textual melody format.
//!
//! A score is a list of tokens separated by whitespace, commas or parentheses.
//! Each token is a pitch (note name, frequency literal or silence marker)
//! optionally followed by a duration:
//!
//! - `C4:0.5` lasts half a second (`:1/8` is also accepted),
//! - `C4_1/4` lasts a quarter note at the compiler's tempo,
//! - `C4` lasts the compiler's default duration.

use super::error::{ParseError, ParseErrorKind};
use super::pitch::parse_pitch;
use super::Note;

/// A raw token and the byte offset where it starts in the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub offset: usize,
}

/// How a token's duration was written.
enum DurationSpec<'a> {
    Default,
    Seconds(&'a str),
    Beats(&'a str),
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == '(' || c == ')'
}

/// Strips enclosing parentheses and surrounding whitespace. Idempotent.
pub fn sanitize_token(token: &str) -> &str {
    token.trim_matches(|c: char| c.is_whitespace() || c == '(' || c == ')')
}

/// Splits a score into tokens.
pub fn tokenize(score: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (offset, c) in score.char_indices() {
        match (is_separator(c), start) {
            (true, Some(begin)) => {
                tokens.push(Token {
                    text: &score[begin..offset],
                    offset: begin,
                });
                start = None;
            }
            (false, None) => start = Some(offset),
            _ => {}
        }
    }
    if let Some(begin) = start {
        tokens.push(Token {
            text: &score[begin..],
            offset: begin,
        });
    }

    tokens
}

/// Parses a single sanitized token.
pub(super) fn parse_token(
    token: &str,
    bpm: f64,
    default_duration: f64,
) -> Result<Note, ParseErrorKind> {
    let (pitch, duration) = match token.split_once(':') {
        Some((pitch, seconds)) => (pitch, DurationSpec::Seconds(seconds)),
        None => match token.split_once('_') {
            Some((pitch, beats)) => (pitch, DurationSpec::Beats(beats)),
            None => (token, DurationSpec::Default),
        },
    };

    let frequency = parse_pitch(pitch)?;
    let duration_seconds = match duration {
        DurationSpec::Default => default_duration,
        DurationSpec::Seconds(text) => parse_number(text)?,
        // A whole note is four beats.
        DurationSpec::Beats(text) => parse_number(text)? * 4.0 * 60.0 / bpm,
    };

    if duration_seconds == 0.0 {
        return Err(ParseErrorKind::ZeroDuration);
    }
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(ParseErrorKind::InvalidDuration);
    }

    Ok(Note {
        frequency,
        duration_seconds,
    })
}

/// Parses a decimal or a `num/den` fraction.
fn parse_number(text: &str) -> Result<f64, ParseErrorKind> {
    let value = match text.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator: f64 = numerator
                .parse()
                .map_err(|_| ParseErrorKind::InvalidDuration)?;
            let denominator: f64 = denominator
                .parse()
                .map_err(|_| ParseErrorKind::InvalidDuration)?;
            if denominator == 0.0 {
                return Err(ParseErrorKind::InvalidDuration);
            }
            numerator / denominator
        }
        None => text.parse().map_err(|_| ParseErrorKind::InvalidDuration)?,
    };

    if value.is_nan() {
        return Err(ParseErrorKind::InvalidDuration);
    }
    Ok(value)
}

/// Compiles every token of the score, stopping at the first malformed one.
pub(super) fn parse_score(
    score: &str,
    bpm: f64,
    default_duration: f64,
) -> Result<Vec<Note>, ParseError> {
    tokenize(score)
        .into_iter()
        .enumerate()
        .map(|(index, token)| {
            let text = sanitize_token(token.text);
            parse_token(text, bpm, default_duration).map_err(|kind| ParseError {
                token: text.to_string(),
                index,
                offset: token.offset,
                kind,
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tokenize_offsets() {
        let tokens = tokenize("(A4) C4:0.5  (  G4 )");
        assert_eq!(
            tokens,
            vec![
                Token {
                    text: "A4",
                    offset: 1
                },
                Token {
                    text: "C4:0.5",
                    offset: 5
                },
                Token {
                    text: "G4",
                    offset: 16
                },
            ]
        );
    }

    #[test]
    fn test_tokenize_commas_and_newlines() {
        let tokens: Vec<&str> = tokenize("(C4_1/4, E4_1/4)\nG4_1/2")
            .into_iter()
            .map(|token| token.text)
            .collect();
        assert_eq!(tokens, vec!["C4_1/4", "E4_1/4", "G4_1/2"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ( ) ,\n").is_empty());
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in ["(A4)", "  ( G4 ) ", "C4:0.5", "((E4", ")", "  ", "F#3)  "] {
            let once = sanitize_token(raw);
            assert_eq!(sanitize_token(once), once, "token {:?}", raw);
        }
        assert_eq!(sanitize_token("  ( G4 ) "), "G4");
    }

    #[test]
    fn test_parse_token_durations() {
        let note = parse_token("C4:0.5", 120.0, 0.25).unwrap();
        assert_eq!(note.duration_seconds, 0.5);

        let note = parse_token("C4:1/8", 120.0, 0.25).unwrap();
        assert_eq!(note.duration_seconds, 0.125);

        // Quarter note at 120 bpm is one beat.
        let note = parse_token("C4_1/4", 120.0, 0.25).unwrap();
        assert_eq!(note.duration_seconds, 0.5);

        let note = parse_token("C4_1/2", 180.0, 0.25).unwrap();
        assert!((note.duration_seconds - 2.0 / 3.0).abs() < 1e-12);

        let note = parse_token("440", 120.0, 0.25).unwrap();
        assert_eq!(note.frequency, 440.0);
        assert_eq!(note.duration_seconds, 0.25);
    }

    #[test]
    fn test_parse_token_errors() {
        assert_eq!(
            parse_token("C4:0", 120.0, 0.25),
            Err(ParseErrorKind::ZeroDuration)
        );
        assert_eq!(
            parse_token("C4_0/4", 120.0, 0.25),
            Err(ParseErrorKind::ZeroDuration)
        );
        assert_eq!(
            parse_token("C4:-1", 120.0, 0.25),
            Err(ParseErrorKind::InvalidDuration)
        );
        assert_eq!(
            parse_token("C4:abc", 120.0, 0.25),
            Err(ParseErrorKind::InvalidDuration)
        );
        assert_eq!(
            parse_token("C4_1/0", 120.0, 0.25),
            Err(ParseErrorKind::InvalidDuration)
        );
        assert_eq!(
            parse_token("C4:", 120.0, 0.25),
            Err(ParseErrorKind::InvalidDuration)
        );
        assert_eq!(
            parse_token(":0.5", 120.0, 0.25),
            Err(ParseErrorKind::Empty)
        );
        assert_eq!(
            parse_token("X4:0.5", 120.0, 0.25),
            Err(ParseErrorKind::InvalidPitch)
        );
    }
}

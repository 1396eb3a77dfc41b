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

/// What was wrong with a melody token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unknown pitch name")]
    InvalidPitch,

    #[error("frequency must be a non-negative number")]
    InvalidFrequency,

    #[error("duration must be a positive number")]
    InvalidDuration,

    #[error("duration must be greater than zero")]
    ZeroDuration,

    #[error("missing pitch")]
    Empty,
}

/// A malformed melody token. Carries the sanitized token, its ordinal among
/// the score's tokens and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid token '{token}' (token {index}, byte {offset}): {kind}")]
pub struct ParseError {
    pub token: String,
    pub index: usize,
    pub offset: usize,
    pub kind: ParseErrorKind,
}

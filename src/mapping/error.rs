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

use std::fmt;

/// The category of a validation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MalformedEntry,
    OverlapConflict,
    MissingAsset,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationErrorKind::MalformedEntry => "malformed entry",
            ValidationErrorKind::OverlapConflict => "overlap conflict",
            ValidationErrorKind::MissingAsset => "missing asset",
        })
    }
}

/// The first irrecoverable problem found while loading a mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("mapping document could not be parsed: {0}")]
    Document(String),

    #[error("mapping entry {index} is malformed: {reason}")]
    MalformedEntry { index: usize, reason: String },

    #[error("mapping entry {index} overlaps entry {conflicts_with} in both trigger and velocity range")]
    OverlapConflict { index: usize, conflicts_with: usize },

    #[error("mapping entry {index} references a missing asset '{asset_path}'")]
    MissingAsset { index: usize, asset_path: String },
}

impl ValidationError {
    /// Returns the category of this error. A document that cannot be parsed at all
    /// is reported as a malformed entry with no index.
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::Document(_) | ValidationError::MalformedEntry { .. } => {
                ValidationErrorKind::MalformedEntry
            }
            ValidationError::OverlapConflict { .. } => ValidationErrorKind::OverlapConflict,
            ValidationError::MissingAsset { .. } => ValidationErrorKind::MissingAsset,
        }
    }

    /// Returns the index of the offending entry, if the error is tied to one.
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::Document(_) => None,
            ValidationError::MalformedEntry { index, .. }
            | ValidationError::OverlapConflict { index, .. }
            | ValidationError::MissingAsset { index, .. } => Some(*index),
        }
    }
}

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

/// The category of an asset failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetErrorKind {
    NotFound,
    DecodeFailure,
    UnsupportedFormat,
}

impl fmt::Display for AssetErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetErrorKind::NotFound => "not found",
            AssetErrorKind::DecodeFailure => "decode failure",
            AssetErrorKind::UnsupportedFormat => "unsupported format",
        })
    }
}

/// An asset could not be turned into an audio buffer.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset '{path}' not found: {detail}")]
    NotFound { path: String, detail: String },

    #[error("failed to decode asset '{path}': {detail}")]
    DecodeFailure { path: String, detail: String },

    #[error("asset '{path}' has an unsupported format: {detail}")]
    UnsupportedFormat { path: String, detail: String },
}

impl AssetError {
    pub(crate) fn not_found(path: &str, detail: impl fmt::Display) -> AssetError {
        AssetError::NotFound {
            path: path.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn decode_failure(path: &str, detail: impl fmt::Display) -> AssetError {
        AssetError::DecodeFailure {
            path: path.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn unsupported_format(path: &str, detail: impl fmt::Display) -> AssetError {
        AssetError::UnsupportedFormat {
            path: path.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> AssetErrorKind {
        match self {
            AssetError::NotFound { .. } => AssetErrorKind::NotFound,
            AssetError::DecodeFailure { .. } => AssetErrorKind::DecodeFailure,
            AssetError::UnsupportedFormat { .. } => AssetErrorKind::UnsupportedFormat,
        }
    }

    /// Returns the asset path the error is about.
    pub fn path(&self) -> &str {
        match self {
            AssetError::NotFound { path, .. }
            | AssetError::DecodeFailure { path, .. }
            | AssetError::UnsupportedFormat { path, .. } => path,
        }
    }
}

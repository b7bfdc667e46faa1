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

use crate::mapping::ValidationError;

/// Code generation could not produce a project.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("unsupported target kind '{0}' (expected 'standalone' or 'plugin')")]
    UnsupportedTargetKind(String),

    #[error("mapping did not validate: {0}")]
    MappingUnresolved(#[source] ValidationError),

    #[error("failed to serialize mapping payload: {0}")]
    Payload(#[from] serde_yml::Error),
}

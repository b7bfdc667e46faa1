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

//! The mapping model: the validated, indexed set of rules binding trigger and
//! velocity ranges to sample assets.

mod entry;
mod error;
mod model;

pub use entry::MappingEntry;
pub use error::{ValidationError, ValidationErrorKind};
pub use model::{MappingModel, TieBreak, TRIGGER_COUNT};

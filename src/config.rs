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

pub mod error;
pub mod mapping;
mod settings;

pub use error::ConfigError;
pub use settings::{
    BuildCommands, Settings, DEFAULT_CHANNELS, DEFAULT_EVENT_QUEUE_CAPACITY,
    DEFAULT_MAX_BLOCK_FRAMES, DEFAULT_POLYPHONY, DEFAULT_SAMPLE_RATE, DEFAULT_SETTINGS_NAME,
};

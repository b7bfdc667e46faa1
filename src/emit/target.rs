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
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::GenerationError;

/// The kind of artifact to generate.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A binary that plays the mapping through an audio device.
    Standalone,
    /// A dynamic library exposing render entry points to a plugin host wrapper.
    Plugin,
}

impl TargetKind {
    /// Gets the name used on the command line and in directory names.
    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::Standalone => "standalone",
            TargetKind::Plugin => "plugin",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetKind {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standalone" => Ok(TargetKind::Standalone),
            "plugin" => Ok(TargetKind::Plugin),
            _ => Err(GenerationError::UnsupportedTargetKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!("standalone".parse::<TargetKind>().unwrap(), TargetKind::Standalone);
        assert_eq!("Plugin".parse::<TargetKind>().unwrap(), TargetKind::Plugin);
        assert!(matches!(
            "vst9".parse::<TargetKind>(),
            Err(GenerationError::UnsupportedTargetKind(name)) if name == "vst9"
        ));
        assert_eq!(TargetKind::Plugin.to_string(), "plugin");
    }
}

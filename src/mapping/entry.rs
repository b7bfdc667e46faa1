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

use std::ops::RangeInclusive;

use serde::Serialize;

use super::error::ValidationError;
use crate::config::mapping::EntryConfig;

/// The highest trigger or velocity value.
const MIDI_MAX: i64 = 127;

/// A single rule binding a trigger and velocity range to a sample asset.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MappingEntry {
    trigger_low: u8,
    trigger_high: u8,
    velocity_low: u8,
    velocity_high: u8,
    asset_path: String,
    root_trigger: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

impl MappingEntry {
    /// Creates a new entry. No validation is performed; use the mapping model to
    /// load entries that need checking.
    pub fn new(
        triggers: RangeInclusive<u8>,
        velocities: RangeInclusive<u8>,
        asset_path: &str,
        root_trigger: u8,
    ) -> MappingEntry {
        MappingEntry {
            trigger_low: *triggers.start(),
            trigger_high: *triggers.end(),
            velocity_low: *velocities.start(),
            velocity_high: *velocities.end(),
            asset_path: asset_path.to_string(),
            root_trigger,
            name: None,
            category: None,
        }
    }

    /// Validates a parsed entry. Missing assets are left to the caller, which knows
    /// whether an asset store is available.
    pub(super) fn from_config(
        index: usize,
        config: &EntryConfig,
    ) -> Result<MappingEntry, ValidationError> {
        let malformed = |reason: String| ValidationError::MalformedEntry { index, reason };

        let trigger_low = midi_value("trigger_low", config.trigger_low()).map_err(malformed)?;
        let trigger_high = midi_value("trigger_high", config.trigger_high()).map_err(malformed)?;
        let velocity_low = midi_value("velocity_low", config.velocity_low()).map_err(malformed)?;
        let velocity_high =
            midi_value("velocity_high", config.velocity_high()).map_err(malformed)?;
        let root_trigger = midi_value("root_trigger", config.root_trigger()).map_err(malformed)?;

        if trigger_low > trigger_high {
            return Err(malformed(format!(
                "trigger_low {} is above trigger_high {}",
                trigger_low, trigger_high
            )));
        }
        if velocity_low > velocity_high {
            return Err(malformed(format!(
                "velocity_low {} is above velocity_high {}",
                velocity_low, velocity_high
            )));
        }
        if !(trigger_low..=trigger_high).contains(&root_trigger) {
            return Err(malformed(format!(
                "root_trigger {} is outside the trigger range {}..={}",
                root_trigger, trigger_low, trigger_high
            )));
        }
        if config.asset_path().trim().is_empty() {
            return Err(ValidationError::MissingAsset {
                index,
                asset_path: config.asset_path().to_string(),
            });
        }

        Ok(MappingEntry {
            trigger_low,
            trigger_high,
            velocity_low,
            velocity_high,
            asset_path: config.asset_path().to_string(),
            root_trigger,
            name: config.name().map(str::to_string),
            category: config.category().map(str::to_string),
        })
    }

    /// Returns true if this entry covers the given trigger and velocity.
    pub fn contains(&self, trigger: u8, velocity: u8) -> bool {
        self.triggers().contains(&trigger) && self.velocities().contains(&velocity)
    }

    /// Returns true if both the trigger and velocity ranges of the two entries intersect.
    pub fn overlaps(&self, other: &MappingEntry) -> bool {
        self.trigger_low <= other.trigger_high
            && other.trigger_low <= self.trigger_high
            && self.velocity_low <= other.velocity_high
            && other.velocity_low <= self.velocity_high
    }

    /// Gets the trigger range.
    pub fn triggers(&self) -> RangeInclusive<u8> {
        self.trigger_low..=self.trigger_high
    }

    /// Gets the velocity range.
    pub fn velocities(&self) -> RangeInclusive<u8> {
        self.velocity_low..=self.velocity_high
    }

    /// Gets the asset path.
    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    /// Gets the trigger at which the asset plays at its original pitch.
    pub fn root_trigger(&self) -> u8 {
        self.root_trigger
    }

    /// Gets the entry name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Gets the entry category.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

fn midi_value(field: &str, value: i64) -> Result<u8, String> {
    if (0..=MIDI_MAX).contains(&value) {
        Ok(value as u8)
    } else {
        Err(format!("{} {} is outside 0..=127", field, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains() {
        let entry = MappingEntry::new(60..=64, 0..=63, "soft.wav", 62);
        assert!(entry.contains(60, 0));
        assert!(entry.contains(64, 63));
        assert!(!entry.contains(59, 10));
        assert!(!entry.contains(65, 10));
        assert!(!entry.contains(62, 64));
    }

    #[test]
    fn overlaps() {
        let soft = MappingEntry::new(60..=64, 0..=63, "soft.wav", 62);
        let loud = MappingEntry::new(60..=64, 64..=127, "loud.wav", 62);
        let shifted = MappingEntry::new(64..=70, 60..=70, "mid.wav", 64);
        let above = MappingEntry::new(65..=70, 0..=127, "high.wav", 65);

        assert!(!soft.overlaps(&loud));
        assert!(soft.overlaps(&shifted));
        assert!(loud.overlaps(&shifted));
        assert!(!soft.overlaps(&above));
        assert!(shifted.overlaps(&above));
    }
}

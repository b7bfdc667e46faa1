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

use serde::{Deserialize, Serialize};
use serde_yml::Value;

use crate::mapping::ValidationError;

/// A YAML (or JSON) representation of a mapping description. Entries are kept as
/// raw values so that each one can be checked on its own and reported by index.
#[derive(Deserialize, Debug, Default)]
pub struct MappingDocument {
    /// An optional instrument name.
    #[serde(default)]
    name: Option<String>,

    /// Optional engine defaults that override the application settings.
    #[serde(default)]
    engine: Option<EngineDefaults>,

    /// The mapping entries in declaration order.
    #[serde(default, alias = "samples")]
    entries: Vec<Value>,
}

impl MappingDocument {
    /// Parses a mapping document. An empty document has no entries.
    pub fn parse(raw: &str) -> Result<MappingDocument, ValidationError> {
        if raw.trim().is_empty() {
            return Ok(MappingDocument::default());
        }
        serde_yml::from_str(raw).map_err(|e| ValidationError::Document(e.to_string()))
    }

    /// Gets the instrument name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Gets the engine defaults.
    pub fn engine(&self) -> Option<&EngineDefaults> {
        self.engine.as_ref()
    }

    /// Consumes the document, returning its parts.
    pub(crate) fn into_parts(self) -> (Option<String>, Option<EngineDefaults>, Vec<Value>) {
        (self.name, self.engine, self.entries)
    }
}

/// Engine defaults carried by a mapping.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct EngineDefaults {
    /// Gain applied to every voice.
    #[serde(default, alias = "master", skip_serializing_if = "Option::is_none")]
    master_gain: Option<f32>,

    /// Attack time as a duration string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attack: Option<String>,

    /// Release time as a duration string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    release: Option<String>,
}

impl EngineDefaults {
    /// Gets the master gain.
    pub fn master_gain(&self) -> Option<f32> {
        self.master_gain
    }

    /// Gets the attack duration string.
    pub fn attack(&self) -> Option<&String> {
        self.attack.as_ref()
    }

    /// Gets the release duration string.
    pub fn release(&self) -> Option<&String> {
        self.release.as_ref()
    }
}

/// One mapping entry as written. Numbers are wide so that out of range values
/// can be reported instead of failing to parse.
#[derive(Deserialize, Debug)]
pub struct EntryConfig {
    #[serde(alias = "triggerLow", alias = "noteLow")]
    trigger_low: i64,

    #[serde(alias = "triggerHigh", alias = "noteHigh")]
    trigger_high: i64,

    #[serde(default, alias = "velocityLow", alias = "velLow")]
    velocity_low: Option<i64>,

    #[serde(default, alias = "velocityHigh", alias = "velHigh")]
    velocity_high: Option<i64>,

    #[serde(alias = "assetPath", alias = "filename")]
    asset_path: String,

    #[serde(alias = "rootTrigger", alias = "rootMidi")]
    root_trigger: i64,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    category: Option<String>,
}

impl EntryConfig {
    /// Deserializes an entry from a raw document value.
    pub fn from_value(value: Value) -> Result<EntryConfig, serde_yml::Error> {
        EntryConfig::deserialize(value)
    }

    pub fn trigger_low(&self) -> i64 {
        self.trigger_low
    }

    pub fn trigger_high(&self) -> i64 {
        self.trigger_high
    }

    /// Gets the low velocity bound, the full range when unset.
    pub fn velocity_low(&self) -> i64 {
        self.velocity_low.unwrap_or(0)
    }

    /// Gets the high velocity bound, the full range when unset.
    pub fn velocity_high(&self) -> i64 {
        self.velocity_high.unwrap_or(127)
    }

    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    pub fn root_trigger(&self) -> i64 {
        self.root_trigger
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_snake_case() {
        let document = MappingDocument::parse(
            r#"
            name: Kit
            entries:
              - trigger_low: 36
                trigger_high: 36
                velocity_low: 0
                velocity_high: 127
                asset_path: kick.wav
                root_trigger: 36
            "#,
        )
        .unwrap();
        assert_eq!(document.name(), Some("Kit"));
        let (_, engine, entries) = document.into_parts();
        assert!(engine.is_none());
        assert_eq!(entries.len(), 1);

        let entry = EntryConfig::from_value(entries[0].clone()).unwrap();
        assert_eq!(entry.trigger_low(), 36);
        assert_eq!(entry.asset_path(), "kick.wav");
    }

    #[test]
    fn parse_export_json() {
        // The export format writes samples with camelCase keys and no velocity range.
        let document = MappingDocument::parse(
            r#"{
                "engine": { "master": 0.85 },
                "samples": [
                    { "filename": "piano_C4.wav", "name": "Piano C4", "rootMidi": 60,
                      "noteLow": 55, "noteHigh": 64, "category": "keys" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(document.engine().and_then(|e| e.master_gain()), Some(0.85));

        let (_, _, entries) = document.into_parts();
        let entry = EntryConfig::from_value(entries[0].clone()).unwrap();
        assert_eq!(entry.root_trigger(), 60);
        assert_eq!(entry.velocity_low(), 0);
        assert_eq!(entry.velocity_high(), 127);
        assert_eq!(entry.name(), Some("Piano C4"));
        assert_eq!(entry.category(), Some("keys"));
    }

    #[test]
    fn empty_document() {
        let (name, engine, entries) = MappingDocument::parse("  \n").unwrap().into_parts();
        assert!(name.is_none());
        assert!(engine.is_none());
        assert!(entries.is_empty());
    }

    #[test]
    fn unparseable_document() {
        assert!(matches!(
            MappingDocument::parse("entries: [unterminated"),
            Err(ValidationError::Document(_))
        ));
    }
}

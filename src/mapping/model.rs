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

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::entry::MappingEntry;
use super::error::ValidationError;
use crate::assets::AssetStore;
use crate::config::mapping::{EngineDefaults, EntryConfig, MappingDocument};

/// The number of distinct trigger values, and so the number of index buckets.
pub const TRIGGER_COUNT: usize = 128;

/// How a lookup picks between several entries that contain the same trigger and
/// velocity. Validation rejects such overlaps, so this only matters for mappings
/// built without it.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The entry declared first wins.
    #[default]
    FirstDeclared,
    /// The entry declared last wins.
    LastDeclared,
}

/// The canonical serialized form of a mapping.
#[derive(Serialize)]
struct Payload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<&'a EngineDefaults>,
    entries: &'a [MappingEntry],
}

/// A validated mapping. Immutable once loaded.
pub struct MappingModel {
    name: Option<String>,
    engine: Option<EngineDefaults>,
    entries: Vec<MappingEntry>,
    /// Entry indices for every trigger value, in declaration order.
    index: Vec<Vec<usize>>,
    tie_break: TieBreak,
}

impl fmt::Debug for MappingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingModel")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .field("tie_break", &self.tie_break)
            .finish()
    }
}

impl MappingModel {
    /// Parses and validates a mapping description.
    pub fn load(raw: &str) -> Result<MappingModel, ValidationError> {
        MappingModel::build(MappingDocument::parse(raw)?, None)
    }

    /// Parses and validates a mapping description, also checking that every asset
    /// the mapping references is present in the given store.
    pub fn load_checked(raw: &str, store: &dyn AssetStore) -> Result<MappingModel, ValidationError> {
        MappingModel::build(MappingDocument::parse(raw)?, Some(store))
    }

    /// Builds a model from already validated entries. Overlaps are not rejected here
    /// and are resolved by the tie-break policy.
    pub fn from_entries(entries: Vec<MappingEntry>) -> MappingModel {
        let mut model = MappingModel::empty(None, None);
        for entry in entries {
            model.push(entry);
        }
        model
    }

    fn empty(name: Option<String>, engine: Option<EngineDefaults>) -> MappingModel {
        MappingModel {
            name,
            engine,
            entries: Vec::new(),
            index: vec![Vec::new(); TRIGGER_COUNT],
            tie_break: TieBreak::default(),
        }
    }

    fn build(
        document: MappingDocument,
        store: Option<&dyn AssetStore>,
    ) -> Result<MappingModel, ValidationError> {
        let (name, engine, raw_entries) = document.into_parts();
        let mut model = MappingModel::empty(name, engine);

        for (index, value) in raw_entries.into_iter().enumerate() {
            let config = EntryConfig::from_value(value).map_err(|e| {
                ValidationError::MalformedEntry {
                    index,
                    reason: e.to_string(),
                }
            })?;
            let entry = MappingEntry::from_config(index, &config)?;

            if let Some(store) = store {
                if !store.contains(entry.asset_path()) {
                    return Err(ValidationError::MissingAsset {
                        index,
                        asset_path: entry.asset_path().to_string(),
                    });
                }
            }

            if let Some(conflicts_with) = model.first_overlap(&entry) {
                return Err(ValidationError::OverlapConflict {
                    index,
                    conflicts_with,
                });
            }

            model.push(entry);
        }

        info!(
            name = model.name.as_deref().unwrap_or("(unnamed)"),
            entries = model.entries.len(),
            assets = model.asset_paths().len(),
            "Mapping loaded"
        );
        Ok(model)
    }

    /// Returns the earliest declared entry that overlaps the given one.
    fn first_overlap(&self, entry: &MappingEntry) -> Option<usize> {
        entry
            .triggers()
            .filter_map(|trigger| {
                self.index[trigger as usize]
                    .iter()
                    .copied()
                    .find(|&i| self.entries[i].overlaps(entry))
            })
            .min()
    }

    fn push(&mut self, entry: MappingEntry) {
        let position = self.entries.len();
        for trigger in entry.triggers() {
            self.index[trigger as usize].push(position);
        }
        self.entries.push(entry);
    }

    /// Sets the tie-break policy used by lookups.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> MappingModel {
        self.tie_break = tie_break;
        self
    }

    /// Returns the entry containing the trigger and velocity, if there is one.
    pub fn resolve(&self, trigger: u8, velocity: u8) -> Option<&MappingEntry> {
        let bucket = self.index.get(trigger as usize)?;
        let mut candidates = bucket
            .iter()
            .map(|&i| &self.entries[i])
            .filter(|entry| entry.velocities().contains(&velocity));

        let found = match self.tie_break {
            TieBreak::FirstDeclared => candidates.next(),
            TieBreak::LastDeclared => candidates.last(),
        };
        if found.is_none() {
            debug!(trigger, velocity, "No mapping entry for trigger");
        }
        found
    }

    /// Gets the unique asset paths referenced by the mapping, in declaration order.
    pub fn asset_paths(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|entry| entry.asset_path())
            .filter(|path| seen.insert(*path))
            .collect()
    }

    /// Serializes the mapping in its canonical YAML form.
    pub fn to_payload(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(&Payload {
            name: self.name.as_deref(),
            engine: self.engine.as_ref(),
            entries: &self.entries,
        })
    }

    /// Gets the entries in declaration order.
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Gets the instrument name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Gets the mapping's engine defaults.
    pub fn engine(&self) -> Option<&EngineDefaults> {
        self.engine.as_ref()
    }

    /// Gets the tie-break policy.
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Returns true if the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

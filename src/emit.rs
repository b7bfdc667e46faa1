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

//! Turns a validated mapping into the files of a standalone or plugin project.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::mapping::{MappingModel, ValidationError};

mod error;
mod scaffold;
mod target;

pub use error::GenerationError;
pub use scaffold::{default_runtime_dependency, ScaffoldFile, ASSETS_DIR, MAPPING_FILE};
pub use target::TargetKind;

/// Everything the build collaborator needs to produce an artifact.
#[derive(Clone, Debug)]
pub struct GenerationResult {
    target: TargetKind,
    package_name: String,
    mapping_payload: String,
    asset_paths: Vec<String>,
    scaffold: Vec<ScaffoldFile>,
}

impl GenerationResult {
    /// Gets the target kind.
    pub fn target(&self) -> TargetKind {
        self.target
    }

    /// Gets the generated crate name.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Gets the serialized mapping embedded by the project.
    pub fn mapping_payload(&self) -> &str {
        &self.mapping_payload
    }

    /// Gets the assets the project needs, in declaration order.
    pub fn asset_paths(&self) -> &[String] {
        &self.asset_paths
    }

    /// Gets the project source files.
    pub fn scaffold(&self) -> &[ScaffoldFile] {
        &self.scaffold
    }

    /// Writes the project files and the mapping payload under the given directory.
    /// Assets are not copied. Returns the written files.
    pub fn write_to(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.scaffold.len() + 1);
        for file in &self.scaffold {
            let path = dir.join(file.path());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, file.contents())?;
            written.push(path);
        }

        fs::create_dir_all(dir)?;
        let mapping = dir.join(MAPPING_FILE);
        fs::write(&mapping, &self.mapping_payload)?;
        written.push(mapping);

        info!(
            dir = ?dir,
            target = %self.target,
            files = written.len(),
            "Project written"
        );
        Ok(written)
    }
}

/// Generates a project for the target from a mapping. A mapping that failed
/// validation produces no output at all. The project depends on this crate by path.
pub fn emit(
    mapping: Result<&MappingModel, &ValidationError>,
    target: TargetKind,
) -> Result<GenerationResult, GenerationError> {
    emit_with_runtime(mapping, target, &default_runtime_dependency())
}

/// Generates a project whose manifest uses the given dependency spec for this
/// crate, e.g. `"0.1"` or `{ git = "..." }`.
pub fn emit_with_runtime(
    mapping: Result<&MappingModel, &ValidationError>,
    target: TargetKind,
    runtime_dependency: &str,
) -> Result<GenerationResult, GenerationError> {
    let model = mapping.map_err(|e| GenerationError::MappingUnresolved(e.clone()))?;

    let package_name = scaffold::package_name(model.name());
    let result = GenerationResult {
        target,
        mapping_payload: model.to_payload()?,
        asset_paths: model
            .asset_paths()
            .into_iter()
            .map(str::to_string)
            .collect(),
        scaffold: scaffold::scaffold(target, &package_name, runtime_dependency),
        package_name,
    };

    info!(
        target = %target,
        package = %result.package_name,
        assets = result.asset_paths.len(),
        "Project generated"
    );
    Ok(result)
}

/// Generates a project for a target given by name.
pub fn emit_named(
    mapping: Result<&MappingModel, &ValidationError>,
    target: &str,
) -> Result<GenerationResult, GenerationError> {
    emit(mapping, target.parse()?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const KIT: &str = r#"
        name: Tiny Kit
        entries:
          - { trigger_low: 36, trigger_high: 36, asset_path: kick.wav, root_trigger: 36 }
          - { trigger_low: 38, trigger_high: 38, asset_path: snare.wav, root_trigger: 38 }
          - { trigger_low: 40, trigger_high: 40, asset_path: snare.wav, root_trigger: 40 }
    "#;

    #[test]
    fn emit_standalone() {
        let model = MappingModel::load(KIT).unwrap();
        let result = emit(Ok(&model), TargetKind::Standalone).unwrap();

        assert_eq!(result.target(), TargetKind::Standalone);
        assert_eq!(result.package_name(), "tiny-kit");
        assert_eq!(result.asset_paths(), &["kick.wav", "snare.wav"]);
        assert_eq!(
            MappingModel::load(result.mapping_payload()).unwrap().entries(),
            model.entries()
        );
        assert!(result
            .scaffold()
            .iter()
            .any(|f| f.contents().contains("fn main()")));
    }

    #[test]
    fn emit_plugin() {
        let model = MappingModel::load(KIT).unwrap();
        let result = emit_named(Ok(&model), "plugin").unwrap();
        assert_eq!(result.target(), TargetKind::Plugin);
        assert!(result
            .scaffold()
            .iter()
            .any(|f| f.contents().contains("cdylib")));
    }

    #[test]
    fn emit_unresolved_mapping() {
        let error = MappingModel::load(
            r#"
            entries:
              - { trigger_low: 36, trigger_high: 40, asset_path: a.wav, root_trigger: 36 }
              - { trigger_low: 38, trigger_high: 38, asset_path: b.wav, root_trigger: 38 }
            "#,
        )
        .unwrap_err();

        let result = emit(Err(&error), TargetKind::Standalone);
        assert!(matches!(
            result,
            Err(GenerationError::MappingUnresolved(ValidationError::OverlapConflict {
                index: 1,
                conflicts_with: 0
            }))
        ));
    }

    #[test]
    fn emit_unknown_target() {
        let model = MappingModel::load(KIT).unwrap();
        assert!(matches!(
            emit_named(Ok(&model), "vst"),
            Err(GenerationError::UnsupportedTargetKind(_))
        ));
    }

    #[test]
    fn emit_with_runtime_override() {
        let model = MappingModel::load(KIT).unwrap();
        let result =
            emit_with_runtime(Ok(&model), TargetKind::Plugin, r#"{ git = "https://example.com/samplesmith" }"#)
                .unwrap();
        let manifest = &result.scaffold()[0];
        assert!(manifest
            .contents()
            .contains(r#"samplesmith = { git = "https://example.com/samplesmith" }"#));
    }

    #[test]
    fn emit_empty_mapping() {
        let model = MappingModel::load("entries: []").unwrap();
        let result = emit(Ok(&model), TargetKind::Plugin).unwrap();
        assert!(result.asset_paths().is_empty());
        assert_eq!(result.package_name(), "sampler-instrument");
    }

    #[test]
    fn write_to() {
        let dir = tempfile::tempdir().unwrap();
        let model = MappingModel::load(KIT).unwrap();
        let result = emit(Ok(&model), TargetKind::Standalone).unwrap();

        let written = result.write_to(dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        let manifest = fs::read_to_string(dir.path().join("Cargo.toml")).unwrap();
        assert!(manifest.contains(&format!("samplesmith = {}", default_runtime_dependency())));
        assert!(dir.path().join("src").join("main.rs").is_file());
        assert_eq!(
            fs::read_to_string(dir.path().join(MAPPING_FILE)).unwrap(),
            result.mapping_payload()
        );
    }
}

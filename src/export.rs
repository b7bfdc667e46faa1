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

//! One export: load the mapping from an export directory, prewarm its assets,
//! generate the project, write it next to the export and optionally build it.
//!
//! An export directory looks like:
//!
//! ```text
//! <exports_root>/<export_id>/
//!     mapping.yaml        (or mapping.yml / mapping.json)
//!     assets/...
//!     project_<target>/   (written by the export)
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::{error, info};

use crate::assets::{AssetError, AssetResolver, FsAssetStore};
use crate::builder::{BuildCollaborator, BuildError, BuildOutput};
use crate::config::Settings;
use crate::emit::{self, GenerationError, GenerationResult, TargetKind, ASSETS_DIR};
use crate::mapping::MappingModel;

/// Mapping file names looked for in an export directory, in order.
const MAPPING_FILE_NAMES: [&str; 3] = ["mapping.yaml", "mapping.yml", "mapping.json"];

/// An export failed.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export '{export_id}' has no mapping file in {}", dir.display())]
    MappingNotFound { export_id: String, dir: PathBuf },

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Progress of an export, from 0 to 100.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportStatus {
    pub progress: u8,
    pub message: String,
}

/// What an export produced.
#[derive(Debug)]
pub struct ExportReport {
    pub export_id: String,
    pub target: TargetKind,
    pub project_dir: PathBuf,
    pub generation: GenerationResult,
    pub build: Option<BuildOutput>,
}

/// A single export. Each session decodes assets with its own resolver.
pub struct ExportSession {
    export_id: String,
    export_dir: PathBuf,
    settings: Settings,
    status: watch::Sender<ExportStatus>,
}

impl ExportSession {
    /// Creates a session for the export with the given ID under the settings' exports root.
    pub fn new(settings: &Settings, export_id: &str) -> ExportSession {
        let (status, _) = watch::channel(ExportStatus {
            progress: 0,
            message: "Queued".to_string(),
        });
        ExportSession {
            export_id: export_id.to_string(),
            export_dir: settings.exports_root().join(export_id),
            settings: settings.clone(),
            status,
        }
    }

    /// Returns a receiver that sees every status update.
    pub fn subscribe(&self) -> watch::Receiver<ExportStatus> {
        self.status.subscribe()
    }

    /// Gets the latest status.
    pub fn status(&self) -> ExportStatus {
        self.status.borrow().clone()
    }

    /// Gets the export directory.
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    fn report(&self, progress: u8, message: impl Into<String>) {
        let message = message.into();
        info!(export_id = %self.export_id, progress, "{}", message);
        self.status.send_replace(ExportStatus { progress, message });
    }

    /// Runs the export for the named target. The project is built only when a
    /// collaborator is given.
    pub async fn run<C: BuildCollaborator>(
        &self,
        target: &str,
        collaborator: Option<&C>,
    ) -> Result<ExportReport, ExportError> {
        let result = self.run_steps(target, collaborator).await;
        match &result {
            Ok(_) => self.report(100, "Done"),
            Err(e) => {
                error!(export_id = %self.export_id, err = %e, "Export failed");
                self.status.send_modify(|status| status.message = format!("Failed: {}", e));
            }
        }
        result
    }

    async fn run_steps<C: BuildCollaborator>(
        &self,
        target: &str,
        collaborator: Option<&C>,
    ) -> Result<ExportReport, ExportError> {
        self.report(5, "Preparing");
        let target: TargetKind = target.parse()?;

        let mapping_file = self.mapping_file()?;
        let raw = fs::read_to_string(&mapping_file).map_err(io_error(&mapping_file))?;

        self.report(15, "Validating mapping");
        let assets_dir = self.export_dir.join(ASSETS_DIR);
        let store = FsAssetStore::new(&assets_dir);
        let model = MappingModel::load_checked(&raw, &store)
            .map(|model| model.with_tie_break(self.settings.tie_break()));

        if let Ok(model) = &model {
            self.report(30, "Prewarming assets");
            let resolver = AssetResolver::new(store.clone(), self.settings.sample_rate());
            resolver.prewarm(model)?;
        }

        self.report(50, format!("Generating {} project", target));
        let runtime = self
            .settings
            .runtime_dependency()
            .map(str::to_string)
            .unwrap_or_else(emit::default_runtime_dependency);
        let generation = emit::emit_with_runtime(model.as_ref(), target, &runtime)?;

        self.report(60, "Writing project");
        let project_dir = self.export_dir.join(format!("project_{}", target));
        generation
            .write_to(&project_dir)
            .map_err(io_error(&project_dir))?;
        self.copy_assets(&store, &generation, &project_dir.join(ASSETS_DIR))?;

        let build = match collaborator {
            Some(collaborator) => {
                self.report(80, "Building");
                Some(collaborator.build(&project_dir, target).await?)
            }
            None => None,
        };

        Ok(ExportReport {
            export_id: self.export_id.clone(),
            target,
            project_dir,
            generation,
            build,
        })
    }

    fn mapping_file(&self) -> Result<PathBuf, ExportError> {
        MAPPING_FILE_NAMES
            .iter()
            .map(|name| self.export_dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| ExportError::MappingNotFound {
                export_id: self.export_id.clone(),
                dir: self.export_dir.clone(),
            })
    }

    fn copy_assets(
        &self,
        store: &FsAssetStore,
        generation: &GenerationResult,
        dest: &Path,
    ) -> Result<(), ExportError> {
        let total = generation.asset_paths().len().max(1);
        for (i, asset) in generation.asset_paths().iter().enumerate() {
            let from = store.locate(asset)?;
            let to = dest.join(asset);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            fs::copy(&from, &to).map_err(io_error(&from))?;
            // Copying runs from 60% to 75%.
            let progress = 60 + (15 * (i + 1) / total) as u8;
            self.report(progress, format!("Copied {}", asset));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSession")
            .field("export_id", &self.export_id)
            .field("export_dir", &self.export_dir)
            .field("status", &*self.status.borrow())
            .finish()
    }
}

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

//! Running the native toolchain over a written project.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::BuildCommands;
use crate::emit::TargetKind;

/// The toolchain failed. Failures are passed through, never retried.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no build command configured for target {0}")]
    EmptyCommand(TargetKind),

    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' failed with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// The result of a successful build.
#[derive(Clone, Debug)]
pub struct BuildOutput {
    /// The directory the build ran in.
    pub project_dir: PathBuf,
    /// Standard output lines.
    pub stdout: Vec<String>,
}

/// Builds a written project into an artifact.
pub trait BuildCollaborator {
    fn build(
        &self,
        project_dir: &Path,
        target: TargetKind,
    ) -> impl Future<Output = Result<BuildOutput, BuildError>> + Send;
}

/// Runs the configured command line in the project directory.
#[derive(Clone, Debug)]
pub struct CommandCollaborator {
    commands: BuildCommands,
}

impl CommandCollaborator {
    pub fn new(commands: BuildCommands) -> CommandCollaborator {
        CommandCollaborator { commands }
    }
}

impl BuildCollaborator for CommandCollaborator {
    async fn build(&self, project_dir: &Path, target: TargetKind) -> Result<BuildOutput, BuildError> {
        let Some((program, args)) = self.commands.for_target(target).split_first() else {
            return Err(BuildError::EmptyCommand(target));
        };
        let command = self.commands.for_target(target).join(" ");

        info!(command = %command, dir = ?project_dir, target = %target, "Running build");
        let output = Command::new(program)
            .args(args)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        for line in &stdout {
            debug!(command = %command, "{}", line);
        }

        if !output.status.success() {
            warn!(command = %command, status = %output.status, "Build failed");
            return Err(BuildError::Failed {
                command,
                status: output.status.to_string(),
                stderr,
            });
        }

        info!(command = %command, "Build finished");
        Ok(BuildOutput {
            project_dir: project_dir.to_path_buf(),
            stdout,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn collaborator(command: &[&str]) -> CommandCollaborator {
        let command: Vec<String> = command.iter().map(|s| s.to_string()).collect();
        CommandCollaborator::new(BuildCommands::new(command.clone(), command))
    }

    #[tokio::test]
    async fn success() {
        let dir = tempfile::tempdir().unwrap();
        let output = collaborator(&["sh", "-c", "echo built; pwd"])
            .build(dir.path(), TargetKind::Standalone)
            .await
            .unwrap();
        assert_eq!(output.stdout[0], "built");
        assert_eq!(output.project_dir, dir.path());
    }

    #[tokio::test]
    async fn failure_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let error = collaborator(&["sh", "-c", "echo linker exploded >&2; exit 3"])
            .build(dir.path(), TargetKind::Plugin)
            .await
            .unwrap_err();
        match error {
            BuildError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "linker exploded");
                assert!(status.contains('3'));
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[tokio::test]
    async fn spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let error = collaborator(&["/nonexistent/toolchain"])
            .build(dir.path(), TargetKind::Standalone)
            .await
            .unwrap_err();
        assert!(matches!(error, BuildError::Spawn { .. }));
    }

    #[tokio::test]
    async fn empty_command() {
        let dir = tempfile::tempdir().unwrap();
        let error = collaborator(&[])
            .build(dir.path(), TargetKind::Plugin)
            .await
            .unwrap_err();
        assert!(matches!(error, BuildError::EmptyCommand(TargetKind::Plugin)));
    }
}

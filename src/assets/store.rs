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

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::error::AssetError;

/// A source of raw encoded asset bytes keyed by logical path.
pub trait AssetStore: Send + Sync {
    /// Reads the encoded bytes of an asset.
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;

    /// Returns true if the store has the asset.
    fn contains(&self, path: &str) -> bool;
}

/// An asset store rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    /// Creates a store that resolves asset paths relative to the given root.
    pub fn new(root: impl Into<PathBuf>) -> FsAssetStore {
        FsAssetStore { root: root.into() }
    }

    /// Gets the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file for the asset path. Paths that would leave the root are refused.
    pub fn locate(&self, path: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(AssetError::not_found(path, "path escapes the asset root"));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetStore for FsAssetStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let file = self.locate(path)?;
        fs::read(&file).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AssetError::not_found(path, "no such file"),
            _ => AssetError::not_found(path, format!("unable to read {}: {}", file.display(), e)),
        })
    }

    fn contains(&self, path: &str) -> bool {
        self.locate(path).map(|file| file.is_file()).unwrap_or(false)
    }
}

/// An in-memory asset store.
#[derive(Default)]
pub struct MemoryAssetStore {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryAssetStore {
    pub fn new() -> MemoryAssetStore {
        MemoryAssetStore::default()
    }

    /// Adds or replaces an asset.
    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.assets.insert(path.to_string(), bytes);
    }
}

impl AssetStore for MemoryAssetStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.assets
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::not_found(path, "not in memory store"))
    }

    fn contains(&self, path: &str) -> bool {
        self.assets.contains_key(path)
    }
}

impl std::fmt::Debug for MemoryAssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAssetStore")
            .field("assets", &self.assets.len())
            .finish()
    }
}

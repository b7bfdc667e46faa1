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
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::buffer::AudioBuffer;
use super::decode::decode;
use super::error::AssetError;
use super::store::AssetStore;
use crate::mapping::MappingModel;

/// Resolves asset paths to decoded buffers at the session's output sample rate.
/// Buffers are kept for the lifetime of the resolver, so one resolver should be
/// created per session.
pub struct AssetResolver {
    store: Box<dyn AssetStore>,
    /// Decoded buffers keyed by asset path.
    cache: RwLock<HashMap<String, Arc<AudioBuffer>>>,
    target_sample_rate: u32,
}

impl AssetResolver {
    /// Creates a new resolver reading from the given store.
    pub fn new(store: impl AssetStore + 'static, target_sample_rate: u32) -> AssetResolver {
        AssetResolver {
            store: Box::new(store),
            cache: RwLock::new(HashMap::new()),
            target_sample_rate,
        }
    }

    /// Returns the decoded buffer for an asset, decoding it on first use.
    pub fn resolve(&self, asset_path: &str) -> Result<Arc<AudioBuffer>, AssetError> {
        if let Some(buffer) = self.cached(asset_path) {
            debug!(path = asset_path, "Using cached sample");
            return Ok(buffer);
        }

        info!(path = asset_path, "Loading sample into memory");
        let decoded = decode(asset_path, self.store.read(asset_path)?)?;
        let buffer = if decoded.sample_rate() != self.target_sample_rate {
            info!(
                path = asset_path,
                from = decoded.sample_rate(),
                to = self.target_sample_rate,
                "Transcoding sample"
            );
            decoded.resampled(self.target_sample_rate)
        } else {
            decoded
        };

        info!(
            path = asset_path,
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate(),
            duration_ms = buffer.duration().as_millis() as u64,
            memory_kb = buffer.memory_size() / 1024,
            "Sample loaded"
        );

        // If another caller decoded the same asset meanwhile, keep the first buffer.
        let mut cache = self.cache.write();
        Ok(cache
            .entry(asset_path.to_string())
            .or_insert_with(|| Arc::new(buffer))
            .clone())
    }

    /// Resolves every asset the mapping references, failing on the first error.
    pub fn prewarm(&self, model: &MappingModel) -> Result<(), AssetError> {
        let paths = model.asset_paths();
        for path in &paths {
            if let Err(e) = self.resolve(path) {
                warn!(path, error = %e, "Failed to prewarm sample");
                return Err(e);
            }
        }
        info!(
            assets = paths.len(),
            memory_kb = self.memory_usage() / 1024,
            "Prewarm complete"
        );
        Ok(())
    }

    /// Returns an already decoded buffer without decoding.
    pub fn cached(&self, asset_path: &str) -> Option<Arc<AudioBuffer>> {
        self.cache.read().get(asset_path).cloned()
    }

    /// Returns true if every asset of the mapping has been decoded.
    pub fn is_warm(&self, model: &MappingModel) -> bool {
        let cache = self.cache.read();
        model
            .asset_paths()
            .iter()
            .all(|path| cache.contains_key(*path))
    }

    /// Gets the number of decoded buffers.
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    /// Returns the bytes held by decoded buffers.
    pub fn memory_usage(&self) -> usize {
        self.cache
            .read()
            .values()
            .map(|buffer| buffer.memory_size())
            .sum()
    }

    /// Gets the output sample rate buffers are converted to.
    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }
}

impl std::fmt::Debug for AssetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetResolver")
            .field("cached_samples", &self.cached_count())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}

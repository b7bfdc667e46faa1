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

//! A ready to play instrument: a validated mapping with every asset prewarmed
//! and an engine built on top of it. This is what generated projects embed.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::assets::{AssetError, AssetResolver, AssetStore, FsAssetStore};
use crate::config::{ConfigError, Settings};
use crate::engine::{self, Renderer, VoiceEngine};
use crate::mapping::{MappingModel, ValidationError};

/// An instrument could not be prepared for playback.
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Both halves of an engine for one mapping.
pub struct Instrument {
    resolver: Arc<AssetResolver>,
    engine: VoiceEngine,
    renderer: Renderer,
}

impl Instrument {
    /// Validates the mapping against the store, prewarms every asset and creates the engine.
    pub fn load(
        mapping: &str,
        store: impl AssetStore + 'static,
        settings: &Settings,
    ) -> Result<Instrument, InstrumentError> {
        let model =
            MappingModel::load_checked(mapping, &store)?.with_tie_break(settings.tie_break());
        let engine_settings = settings.engine_settings(model.engine())?;

        let resolver = Arc::new(AssetResolver::new(store, engine_settings.sample_rate));
        resolver.prewarm(&model)?;

        let model = Arc::new(model);
        let (engine, renderer) = engine::create(model, resolver.clone(), &engine_settings);
        info!(
            entries = engine.model().entries().len(),
            polyphony = engine_settings.polyphony,
            sample_rate = engine_settings.sample_rate,
            "Instrument ready"
        );

        Ok(Instrument {
            resolver,
            engine,
            renderer,
        })
    }

    /// Loads an instrument whose assets live in a directory.
    pub fn from_dir(
        mapping: &str,
        assets: &Path,
        settings: &Settings,
    ) -> Result<Instrument, InstrumentError> {
        Instrument::load(mapping, FsAssetStore::new(assets), settings)
    }

    /// Gets the control half.
    pub fn engine(&self) -> &VoiceEngine {
        &self.engine
    }

    /// Gets the render half.
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Gets the output channel count.
    pub fn channels(&self) -> usize {
        self.renderer.channels()
    }

    /// Gets the resolver holding the decoded assets.
    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Splits the instrument so that the renderer can move to an audio thread.
    pub fn into_parts(self) -> (VoiceEngine, Renderer) {
        (self.engine, self.renderer)
    }
}

impl std::fmt::Debug for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrument")
            .field("engine", &self.engine)
            .field("renderer", &self.renderer)
            .field("resolver", &self.resolver)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetErrorKind, MemoryAssetStore};
    use crate::mapping::ValidationErrorKind;
    use crate::testutil::wav_bytes;

    const MAPPING: &str = r#"
        name: Test
        engine:
          master_gain: 0.5
        entries:
          - { trigger_low: 60, trigger_high: 60, asset_path: tone.wav, root_trigger: 60 }
    "#;

    #[test]
    fn plays() {
        let mut store = MemoryAssetStore::new();
        store.insert("tone.wav", wav_bytes(&[0.5; 64], 1, 44100));

        let mut instrument = Instrument::load(MAPPING, store, &Settings::default()).unwrap();
        assert!(instrument.resolver().cached("tone.wav").is_some());

        instrument.engine().trigger(60, 127, 0).unwrap();
        let block = instrument.renderer_mut().render_block(4);
        // Mapping-level master gain applies on top of velocity.
        assert_eq!(block, &[0.25; 8]);
    }

    #[test]
    fn missing_asset() {
        let error = Instrument::load(MAPPING, MemoryAssetStore::new(), &Settings::default())
            .unwrap_err();
        assert!(matches!(
            error,
            InstrumentError::Validation(ref e) if e.kind() == ValidationErrorKind::MissingAsset
        ));
    }

    #[test]
    fn undecodable_asset() {
        let mut store = MemoryAssetStore::new();
        store.insert("tone.wav", b"not a wav file".to_vec());
        let error = Instrument::load(MAPPING, store, &Settings::default()).unwrap_err();
        assert!(matches!(
            error,
            InstrumentError::Asset(ref e) if e.kind() != AssetErrorKind::NotFound
        ));
    }
}

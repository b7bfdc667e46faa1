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

//! Polyphonic sample playback.
//!
//! The engine is split in two. [`VoiceEngine`] lives in the control domain: it
//! resolves triggers against the mapping and queues events. [`Renderer`] lives in
//! the render domain: it owns the voice pool, drains the queue at the start of
//! every block and mixes the active voices. The halves only share a bounded
//! channel and a set of atomic counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::assets::AssetResolver;
use crate::config::{
    DEFAULT_CHANNELS, DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_MAX_BLOCK_FRAMES, DEFAULT_POLYPHONY,
    DEFAULT_SAMPLE_RATE,
};
use crate::mapping::MappingModel;

mod control;
mod envelope;
mod event;
pub mod offline;
mod pool;
mod render;
mod voice;

pub use control::{pitch_ratio, velocity_gain, Rejected, VoiceEngine, VoiceHandle};
pub use envelope::Envelope;
pub use pool::VoicePool;
pub use render::Renderer;
pub use voice::{Voice, VoiceState};

/// Runtime parameters for one engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub polyphony: usize,
    pub max_block_frames: usize,
    pub event_queue_capacity: usize,
    pub attack: Duration,
    pub release: Duration,
    pub master_gain: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            polyphony: DEFAULT_POLYPHONY,
            max_block_frames: DEFAULT_MAX_BLOCK_FRAMES,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            attack: Duration::ZERO,
            release: Duration::from_millis(50),
            master_gain: 1.0,
        }
    }
}

/// Counters written by the renderer and read by the control side.
#[derive(Debug, Default)]
pub struct EngineStats {
    active_voices: AtomicUsize,
    evictions: AtomicU64,
    dropped_triggers: AtomicU64,
    frames_rendered: AtomicU64,
}

impl EngineStats {
    /// Gets the number of non-free voices as of the last rendered block.
    pub fn active_voices(&self) -> usize {
        self.active_voices.load(Ordering::Relaxed)
    }

    /// Gets the number of voices cut short to make room for a new trigger.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Gets the number of triggers dropped because the pool had no slots.
    pub fn dropped_triggers(&self) -> u64 {
        self.dropped_triggers.load(Ordering::Relaxed)
    }

    /// Gets the renderer clock in frames.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Acquire)
    }
}

/// Creates the two halves of an engine for a validated mapping. Every asset the
/// mapping references should be prewarmed in the resolver before triggering.
pub fn create(
    model: Arc<MappingModel>,
    resolver: Arc<AssetResolver>,
    settings: &EngineSettings,
) -> (VoiceEngine, Renderer) {
    let (sender, receiver) = crossbeam_channel::bounded(settings.event_queue_capacity.max(1));
    let stats = Arc::new(EngineStats::default());
    (
        VoiceEngine::new(model, resolver, sender, settings, stats.clone()),
        Renderer::new(receiver, settings, stats),
    )
}

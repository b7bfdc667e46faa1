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

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::envelope::Envelope;
use super::event::ControlEvent;
use super::pool::{Allocation, VoicePool};
use super::{EngineSettings, EngineStats};

/// The real-time half of the engine. Nothing here blocks, decodes, logs or
/// allocates while rendering into a caller supplied buffer.
pub struct Renderer {
    events: Receiver<ControlEvent>,
    pool: VoicePool,
    envelope: Envelope,
    channels: usize,
    sample_rate: u32,
    max_block_frames: usize,
    /// Block storage for render_block.
    scratch: Vec<f32>,
    /// Frames rendered so far.
    clock: u64,
    stats: Arc<EngineStats>,
}

impl Renderer {
    pub(super) fn new(
        events: Receiver<ControlEvent>,
        settings: &EngineSettings,
        stats: Arc<EngineStats>,
    ) -> Renderer {
        let channels = (settings.channels as usize).max(1);
        Renderer {
            events,
            pool: VoicePool::new(settings.polyphony),
            envelope: Envelope::new(settings.attack, settings.release, settings.sample_rate),
            channels,
            sample_rate: settings.sample_rate,
            max_block_frames: settings.max_block_frames,
            scratch: vec![0.0; settings.max_block_frames * channels],
            clock: 0,
            stats,
        }
    }

    /// Renders the next block of interleaved frames. Blocks larger than the
    /// configured maximum grow the internal buffer once.
    pub fn render_block(&mut self, frame_count: usize) -> &[f32] {
        let len = frame_count * self.channels;
        if self.scratch.len() < len {
            self.scratch.resize(len, 0.0);
        }
        let mut scratch = std::mem::take(&mut self.scratch);
        self.render_into(&mut scratch[..len]);
        self.scratch = scratch;
        &self.scratch[..len]
    }

    /// Renders interleaved frames into the given buffer, overwriting it. A trailing
    /// partial frame is left silent.
    pub fn render_into(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        self.apply_pending_events();

        let frames = out.len() / self.channels;
        self.pool.render(out, self.channels, &self.envelope);
        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        self.clock += frames as u64;
        self.stats
            .active_voices
            .store(self.pool.active_count(), Ordering::Relaxed);
        self.stats.frames_rendered.store(self.clock, Ordering::Release);
    }

    fn apply_pending_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ControlEvent::Trigger(trigger) => {
                    let delay = trigger.start_frame.saturating_sub(self.clock) as usize;
                    match self.pool.start(trigger, delay) {
                        Some(Allocation::Evicted(_)) => {
                            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                        }
                        Some(Allocation::Free(_)) => {}
                        None => {
                            self.stats.dropped_triggers.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                ControlEvent::Release { trigger } => {
                    self.pool.release_trigger(trigger, &self.envelope);
                }
                ControlEvent::ReleaseAll => {
                    self.pool.release_all(&self.envelope);
                }
            }
        }
    }

    /// Gets the frames rendered so far.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Gets the voice pool.
    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Gets the output channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Gets the output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Gets the block size the renderer is sized for.
    pub fn max_block_frames(&self) -> usize {
        self.max_block_frames
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("pool", &self.pool)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::assets::{AssetResolver, MemoryAssetStore};
    use crate::engine::{self, EngineSettings, Renderer, VoiceEngine, VoiceState};
    use crate::mapping::MappingModel;
    use crate::testutil::wav_bytes;

    fn kick() -> Vec<f32> {
        (0..4096).map(|i| ((i % 200) as f32 / 100.0) - 1.0).collect()
    }

    fn setup(settings: &EngineSettings, mapping: &str) -> (VoiceEngine, Renderer) {
        let mut store = MemoryAssetStore::new();
        store.insert("kick.wav", wav_bytes(&kick(), 1, 44100));
        store.insert("loud.wav", wav_bytes(&[0.9; 4096], 1, 44100));

        let model = Arc::new(MappingModel::load(mapping).unwrap());
        let resolver = Arc::new(AssetResolver::new(store, settings.sample_rate));
        resolver.prewarm(&model).unwrap();
        engine::create(model, resolver, settings)
    }

    const KICK: &str = r#"
        entries:
          - { trigger_low: 60, trigger_high: 60, velocity_low: 0, velocity_high: 127,
              asset_path: kick.wav, root_trigger: 60 }
    "#;

    const LOUD: &str = r#"
        entries:
          - { trigger_low: 0, trigger_high: 127, asset_path: loud.wav, root_trigger: 60 }
    "#;

    #[test]
    fn kick_block() {
        let (engine, mut renderer) = setup(&EngineSettings::default(), KICK);
        engine.trigger(60, 100, 0).unwrap();

        let block = renderer.render_block(512);
        assert_eq!(block.len(), 1024);

        let kick = kick();
        for frame in 0..512 {
            let expected = kick[frame] * (100.0 / 127.0);
            assert_eq!(block[frame * 2], expected, "frame {}", frame);
            assert_eq!(block[frame * 2 + 1], expected, "frame {}", frame);
        }
        assert_eq!(renderer.clock(), 512);
        assert_eq!(engine.now(), 512);
        assert_eq!(engine.stats().active_voices(), 1);
    }

    #[test]
    fn silence_without_voices() {
        let (_engine, mut renderer) = setup(&EngineSettings::default(), KICK);
        assert!(renderer.render_block(256).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn release_reaches_free() {
        let settings = EngineSettings {
            release: Duration::from_millis(10),
            ..Default::default()
        };
        let (engine, mut renderer) = setup(&settings, KICK);
        engine.trigger(60, 100, 0).unwrap();
        engine.release(60).unwrap();

        // 10ms at 44.1kHz is 441 frames.
        let mut blocks = 0;
        loop {
            renderer.render_block(128);
            blocks += 1;
            if renderer.pool().active_count() == 0 {
                break;
            }
            assert!(blocks < 5, "voice never freed");
        }
        assert_eq!(engine.stats().active_voices(), 0);
    }

    #[test]
    fn voice_frees_at_sample_end() {
        let (engine, mut renderer) = setup(&EngineSettings::default(), KICK);
        engine.trigger(60, 127, 0).unwrap();
        renderer.render_block(4000);
        assert_eq!(renderer.pool().active_count(), 1);
        let block = renderer.render_block(200).to_vec();
        assert_eq!(renderer.pool().active_count(), 0);
        assert!(block[96 * 2..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn timestamp_delays_start() {
        let (engine, mut renderer) = setup(&EngineSettings::default(), LOUD);
        renderer.render_block(64);

        // Frame 100 is 36 frames into the next 64 frame block.
        engine.trigger(60, 127, 100).unwrap();
        let block = renderer.render_block(64);
        assert!(block[..36 * 2].iter().all(|s| *s == 0.0));
        assert_eq!(block[36 * 2], 0.9);

        // A timestamp in the past starts at the next block.
        engine.trigger(61, 127, 3).unwrap();
        renderer.render_block(64);
        let voice = renderer
            .pool()
            .voices()
            .iter()
            .find(|v| v.trigger() == 61)
            .unwrap();
        assert!(voice.position() > 63.0);
    }

    #[test]
    fn output_is_clamped() {
        let (engine, mut renderer) = setup(&EngineSettings::default(), LOUD);
        engine.trigger(60, 127, 0).unwrap();
        engine.trigger(60, 127, 0).unwrap();
        engine.trigger(60, 127, 0).unwrap();
        let block = renderer.render_block(32);
        assert!(block.iter().all(|s| *s == 1.0));
    }

    #[test]
    fn polyphony_limit() {
        let settings = EngineSettings {
            polyphony: 4,
            attack: Duration::from_secs(1),
            ..Default::default()
        };
        let (engine, mut renderer) = setup(&settings, LOUD);
        for trigger in 0..10 {
            engine.trigger(trigger, 100, 0).unwrap();
        }
        renderer.render_block(64);

        assert_eq!(renderer.pool().active_count(), 4);
        assert_eq!(engine.stats().dropped_triggers(), 0);
        assert_eq!(engine.stats().evictions(), 6);
        let mut playing: Vec<u8> = renderer.pool().voices().iter().map(|v| v.trigger()).collect();
        playing.sort();
        assert_eq!(playing, vec![6, 7, 8, 9]);
    }

    #[test]
    fn chord_over_polyphony_in_one_block() {
        let settings = EngineSettings {
            polyphony: 2,
            attack: Duration::ZERO,
            ..Default::default()
        };
        let (engine, mut renderer) = setup(&settings, LOUD);
        engine.trigger(60, 100, 0).unwrap();
        engine.trigger(61, 100, 0).unwrap();
        engine.trigger(62, 100, 0).unwrap();
        renderer.render_block(64);

        assert_eq!(renderer.pool().active_count(), 2);
        assert_eq!(engine.stats().dropped_triggers(), 0);
        assert_eq!(engine.stats().evictions(), 1);
        let mut playing: Vec<u8> = renderer.pool().voices().iter().map(|v| v.trigger()).collect();
        playing.sort();
        assert_eq!(playing, vec![61, 62]);
    }

    #[test]
    fn eviction_is_counted() {
        let settings = EngineSettings {
            polyphony: 2,
            ..Default::default()
        };
        let (engine, mut renderer) = setup(&settings, LOUD);
        engine.trigger(10, 100, 0).unwrap();
        engine.trigger(11, 100, 0).unwrap();
        renderer.render_block(8);
        engine.trigger(12, 100, 0).unwrap();
        renderer.render_block(8);

        assert_eq!(engine.stats().evictions(), 1);
        assert!(renderer.pool().voices().iter().all(|v| v.trigger() != 10));
    }

    #[test]
    fn release_all() {
        let (engine, mut renderer) = setup(&EngineSettings::default(), LOUD);
        for trigger in 40..48 {
            engine.trigger(trigger, 100, 0).unwrap();
        }
        renderer.render_block(8);
        engine.release_all().unwrap();
        renderer.render_block(8);
        assert!(renderer
            .pool()
            .voices()
            .iter()
            .filter(|v| v.state().is_active())
            .all(|v| v.state() == VoiceState::Release));
    }

    #[test]
    fn oversized_block() {
        let settings = EngineSettings {
            max_block_frames: 16,
            ..Default::default()
        };
        let (_engine, mut renderer) = setup(&settings, KICK);
        assert_eq!(renderer.render_block(8).len(), 16);
        assert_eq!(renderer.render_block(64).len(), 128);
        assert_eq!(renderer.clock(), 72);
    }
}

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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use midly::live::LiveEvent;
use midly::MidiMessage;
use tracing::{debug, error, warn};

use super::event::{ControlEvent, TriggerEvent};
use super::{EngineSettings, EngineStats};
use crate::assets::AssetResolver;
use crate::mapping::MappingModel;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the voice started by one trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceHandle(u64);

impl VoiceHandle {
    pub(super) fn next() -> VoiceHandle {
        VoiceHandle(NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Gets the numeric ID.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Why a control event was not queued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("no mapping entry for trigger {trigger} at velocity {velocity}")]
    NoMapping { trigger: u8, velocity: u8 },

    #[error("asset '{asset_path}' was not prewarmed before playback")]
    NotWarmed { asset_path: String },

    #[error("the event queue is full")]
    QueueFull,

    #[error("the renderer has gone away")]
    Disconnected,
}

/// Returns the playback rate that shifts a sample recorded at the root trigger to
/// the given trigger, in equal temperament.
pub fn pitch_ratio(trigger: u8, root_trigger: u8) -> f64 {
    2f64.powf((trigger as f64 - root_trigger as f64) / 12.0)
}

/// Returns the gain for a velocity.
pub fn velocity_gain(velocity: u8) -> f32 {
    velocity as f32 / 127.0
}

/// The control half of the engine. Never touches voices directly; every change
/// is queued for the renderer.
pub struct VoiceEngine {
    model: Arc<MappingModel>,
    resolver: Arc<AssetResolver>,
    events: Sender<ControlEvent>,
    sample_rate: u32,
    master_gain: f32,
    stats: Arc<EngineStats>,
    /// Evictions already logged by `log_evictions`.
    logged_evictions: AtomicU64,
}

impl VoiceEngine {
    pub(super) fn new(
        model: Arc<MappingModel>,
        resolver: Arc<AssetResolver>,
        events: Sender<ControlEvent>,
        settings: &EngineSettings,
        stats: Arc<EngineStats>,
    ) -> VoiceEngine {
        VoiceEngine {
            model,
            resolver,
            events,
            sample_rate: settings.sample_rate,
            master_gain: settings.master_gain,
            stats,
            logged_evictions: AtomicU64::new(0),
        }
    }

    /// Starts a voice for the trigger at the given renderer frame. A frame that has
    /// already passed starts at the next block.
    pub fn trigger(
        &self,
        trigger: u8,
        velocity: u8,
        timestamp: u64,
    ) -> Result<VoiceHandle, Rejected> {
        self.log_evictions();
        let entry = self
            .model
            .resolve(trigger, velocity)
            .ok_or(Rejected::NoMapping { trigger, velocity })?;

        // Decoding here would stall the caller; everything must be prewarmed.
        let Some(buffer) = self.resolver.cached(entry.asset_path()) else {
            error!(
                path = entry.asset_path(),
                trigger, "Sample was not prewarmed before playback"
            );
            return Err(Rejected::NotWarmed {
                asset_path: entry.asset_path().to_string(),
            });
        };

        let gain = velocity_gain(velocity) * self.master_gain;
        let rate = pitch_ratio(trigger, entry.root_trigger()) * buffer.sample_rate() as f64
            / self.sample_rate as f64;
        let handle = VoiceHandle::next();

        self.send(ControlEvent::Trigger(TriggerEvent {
            handle,
            trigger,
            velocity,
            buffer,
            gain,
            rate,
            start_frame: timestamp,
        }))?;

        debug!(
            trigger,
            velocity,
            path = entry.asset_path(),
            gain,
            rate,
            voice_id = handle.id(),
            "Triggered voice"
        );
        Ok(handle)
    }

    /// Releases every attacking or sustaining voice started by the trigger.
    pub fn release(&self, trigger: u8) -> Result<(), Rejected> {
        self.send(ControlEvent::Release { trigger })?;
        debug!(trigger, "Released trigger");
        Ok(())
    }

    /// Releases every voice.
    pub fn release_all(&self) -> Result<(), Rejected> {
        self.send(ControlEvent::ReleaseAll)?;
        debug!("Released all voices");
        Ok(())
    }

    /// Handles a raw MIDI message: Note On triggers, Note Off (or Note On with zero
    /// velocity) releases. Everything else is ignored.
    pub fn process_midi_event(&self, raw_event: &[u8]) {
        let event = match LiveEvent::parse(raw_event) {
            Ok(event) => event,
            Err(e) => {
                debug!(err = ?e, "Ignoring unparseable MIDI event");
                return;
            }
        };
        let LiveEvent::Midi { message, .. } = event else {
            return;
        };

        let result = match message {
            MidiMessage::NoteOn { key, vel } if u8::from(vel) == 0 => self.release(u8::from(key)),
            MidiMessage::NoteOn { key, vel } => self
                .trigger(u8::from(key), u8::from(vel), self.now())
                .map(|_| ()),
            MidiMessage::NoteOff { key, .. } => self.release(u8::from(key)),
            _ => Ok(()),
        };
        if let Err(e) = result {
            debug!(err = %e, "MIDI event not applied");
        }
    }

    /// Logs evictions the renderer has made since the last call and returns how
    /// many there were. The renderer never logs, so this runs on every trigger.
    pub fn log_evictions(&self) -> u64 {
        let total = self.stats.evictions();
        let logged = self.logged_evictions.swap(total, Ordering::Relaxed);
        let new = total.saturating_sub(logged);
        if new > 0 {
            warn!(
                evictions = new,
                total,
                active_voices = self.stats.active_voices(),
                "Polyphony limit reached, voices evicted"
            );
        }
        new
    }

    /// Gets the renderer clock: the first frame of the next block.
    pub fn now(&self) -> u64 {
        self.stats.frames_rendered()
    }

    /// Gets the engine counters.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Gets the mapping this engine plays.
    pub fn model(&self) -> &MappingModel {
        &self.model
    }

    fn send(&self, event: ControlEvent) -> Result<(), Rejected> {
        self.events.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!("Voice event queue is full, dropping event");
                Rejected::QueueFull
            }
            TrySendError::Disconnected(_) => Rejected::Disconnected,
        })
    }
}

impl std::fmt::Debug for VoiceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceEngine")
            .field("model", &self.model)
            .field("sample_rate", &self.sample_rate)
            .field("master_gain", &self.master_gain)
            .field("active_voices", &self.stats.active_voices())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assets::{AssetResolver, MemoryAssetStore};
    use crate::engine::{self, EngineSettings, Renderer, VoiceState};
    use crate::testutil::wav_bytes;

    const KIT: &str = r#"
        entries:
          - { trigger_low: 36, trigger_high: 36, asset_path: kick.wav, root_trigger: 36 }
          - { trigger_low: 48, trigger_high: 72, asset_path: tone.wav, root_trigger: 60 }
    "#;

    fn setup(settings: &EngineSettings, prewarm: bool) -> (VoiceEngine, Renderer) {
        let mut store = MemoryAssetStore::new();
        store.insert("kick.wav", wav_bytes(&[0.5; 2048], 1, 44100));
        store.insert("tone.wav", wav_bytes(&[0.25; 2048], 1, 22050));

        let model = Arc::new(MappingModel::load(KIT).unwrap());
        let resolver = Arc::new(AssetResolver::new(store, settings.sample_rate));
        if prewarm {
            resolver.prewarm(&model).unwrap();
        }
        engine::create(model, resolver, settings)
    }

    #[test]
    fn ratios() {
        assert_eq!(pitch_ratio(60, 60), 1.0);
        assert_eq!(pitch_ratio(72, 60), 2.0);
        assert_eq!(pitch_ratio(48, 60), 0.5);
        assert!((pitch_ratio(67, 60) - 1.4983).abs() < 1e-4);
        assert_eq!(velocity_gain(127), 1.0);
        assert_eq!(velocity_gain(0), 0.0);
    }

    #[test]
    fn rejects_unmapped_and_unwarmed() {
        let settings = EngineSettings::default();
        let (engine, _renderer) = setup(&settings, false);

        assert_eq!(
            engine.trigger(37, 100, 0),
            Err(Rejected::NoMapping {
                trigger: 37,
                velocity: 100
            })
        );
        assert_eq!(
            engine.trigger(36, 100, 0),
            Err(Rejected::NotWarmed {
                asset_path: "kick.wav".to_string()
            })
        );
    }

    #[test]
    fn queue_full() {
        let settings = EngineSettings {
            event_queue_capacity: 2,
            ..Default::default()
        };
        let (engine, mut renderer) = setup(&settings, true);

        assert!(engine.trigger(36, 100, 0).is_ok());
        assert!(engine.release(36).is_ok());
        assert_eq!(engine.trigger(36, 100, 0), Err(Rejected::QueueFull));

        renderer.render_block(64);
        assert!(engine.trigger(36, 100, 0).is_ok());
    }

    #[test]
    fn handles_are_unique() {
        let (engine, _renderer) = setup(&EngineSettings::default(), true);
        let first = engine.trigger(36, 100, 0).unwrap();
        let second = engine.trigger(36, 100, 0).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn rate_accounts_for_pitch_and_sample_rate() {
        let (engine, mut renderer) = setup(&EngineSettings::default(), true);
        // The tone is resampled to the output rate, so only pitch changes the rate.
        engine.trigger(72, 127, 0).unwrap();
        renderer.render_block(10);

        let voice = renderer
            .pool()
            .voices()
            .iter()
            .find(|v| v.state().is_active())
            .unwrap();
        assert_eq!(voice.trigger(), 72);
        assert_eq!(voice.position(), 20.0);
    }

    #[test]
    fn evictions_are_logged_once() {
        let settings = EngineSettings {
            polyphony: 1,
            ..Default::default()
        };
        let (engine, mut renderer) = setup(&settings, true);

        engine.trigger(36, 100, 0).unwrap();
        engine.trigger(36, 100, 0).unwrap();
        renderer.render_block(16);
        assert_eq!(engine.stats().evictions(), 1);
        assert_eq!(engine.log_evictions(), 1);
        assert_eq!(engine.log_evictions(), 0);

        // The next trigger logs the eviction the renderer made for the previous one.
        engine.trigger(36, 100, 0).unwrap();
        renderer.render_block(16);
        engine.trigger(36, 100, 0).unwrap();
        assert_eq!(engine.log_evictions(), 0);
        assert_eq!(engine.stats().evictions(), 2);
    }

    #[test]
    fn midi_events() {
        let (engine, mut renderer) = setup(&EngineSettings::default(), true);

        engine.process_midi_event(&[0x90, 36, 100]);
        renderer.render_block(16);
        assert_eq!(renderer.pool().active_count(), 1);
        assert_eq!(renderer.pool().voices()[0].velocity(), 100);

        engine.process_midi_event(&[0x80, 36, 0]);
        renderer.render_block(16);
        assert_eq!(renderer.pool().voices()[0].state(), VoiceState::Release);

        engine.process_midi_event(&[0x91, 60, 90]);
        engine.process_midi_event(&[0x91, 60, 0]);
        renderer.render_block(16);
        assert!(renderer
            .pool()
            .voices()
            .iter()
            .filter(|v| v.trigger() == 60)
            .all(|v| v.state() != VoiceState::Sustain));

        // Unmapped notes, controllers and garbage are ignored.
        engine.process_midi_event(&[0x90, 37, 100]);
        engine.process_midi_event(&[0xB0, 7, 100]);
        engine.process_midi_event(&[0xFF, 0xFF]);
    }
}

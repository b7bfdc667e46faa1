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

//! A single playback slot.

use std::sync::Arc;

use super::control::VoiceHandle;
use super::envelope::Envelope;
use super::event::TriggerEvent;
use crate::assets::AudioBuffer;

/// The lifecycle state of a voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    Free,
    Attack,
    Sustain,
    Release,
}

impl VoiceState {
    /// Returns true if moving from this state to the next one is allowed.
    pub fn can_transition_to(self, next: VoiceState) -> bool {
        use VoiceState::*;
        matches!(
            (self, next),
            (Free, Attack)
                | (Attack, Sustain)
                | (Attack, Release)
                | (Sustain, Release)
                | (Release, Free)
                // Natural end of the sample, or eviction.
                | (Attack, Free)
                | (Sustain, Free)
        )
    }

    /// Returns true for any state but free.
    pub fn is_active(self) -> bool {
        self != VoiceState::Free
    }
}

/// A voice slot. Slots are allocated once and reused for every activation.
pub struct Voice {
    state: VoiceState,
    handle: Option<VoiceHandle>,
    trigger: u8,
    velocity: u8,
    buffer: Option<Arc<AudioBuffer>>,
    /// Fractional read position in buffer frames.
    position: f64,
    rate: f64,
    gain: f32,
    level: f32,
    release_step: f32,
    /// Frames of silence before the voice starts reading its buffer.
    delay_frames: usize,
    /// Allocation order. Lower is older.
    age: u64,
}

impl Voice {
    pub(super) fn idle() -> Voice {
        Voice {
            state: VoiceState::Free,
            handle: None,
            trigger: 0,
            velocity: 0,
            buffer: None,
            position: 0.0,
            rate: 1.0,
            gain: 0.0,
            level: 0.0,
            release_step: 0.0,
            delay_frames: 0,
            age: 0,
        }
    }

    /// Gets the state.
    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Gets the handle of the trigger that started this voice.
    pub fn handle(&self) -> Option<VoiceHandle> {
        self.handle
    }

    /// Gets the trigger that started this voice.
    pub fn trigger(&self) -> u8 {
        self.trigger
    }

    /// Gets the velocity that started this voice.
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Gets the read position in buffer frames.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Gets the envelope level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Gets the allocation age.
    pub fn age(&self) -> u64 {
        self.age
    }

    fn transition(&mut self, next: VoiceState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid voice transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Starts the voice. The slot must be free.
    pub(super) fn start(&mut self, event: TriggerEvent, delay_frames: usize, age: u64) {
        self.transition(VoiceState::Attack);
        self.handle = Some(event.handle);
        self.trigger = event.trigger;
        self.velocity = event.velocity;
        self.buffer = Some(event.buffer);
        self.position = 0.0;
        self.rate = event.rate;
        self.gain = event.gain;
        self.level = 0.0;
        self.release_step = 0.0;
        self.delay_frames = delay_frames;
        self.age = age;
    }

    /// Moves an attacking or sustaining voice into release. Returns true if it changed.
    pub(super) fn release(&mut self, envelope: &Envelope) -> bool {
        match self.state {
            VoiceState::Attack | VoiceState::Sustain => {
                if self.state == VoiceState::Attack && envelope.attack_frames() == 0 {
                    self.level = 1.0;
                }
                self.release_step = envelope.release_step(self.level);
                self.transition(VoiceState::Release);
                true
            }
            VoiceState::Release | VoiceState::Free => false,
        }
    }

    /// Frees the voice. Dropping the buffer only releases a reference; the
    /// resolver cache still holds the data.
    pub(super) fn finish(&mut self) {
        if self.state.is_active() {
            self.transition(VoiceState::Free);
        }
        self.buffer = None;
        self.level = 0.0;
        self.delay_frames = 0;
    }

    /// Mixes this voice into an interleaved block.
    pub(super) fn render(&mut self, out: &mut [f32], channels: usize, envelope: &Envelope) {
        if !self.state.is_active() {
            return;
        }
        let Some(buffer) = self.buffer.clone() else {
            self.finish();
            return;
        };

        let frame_count = buffer.frame_count();
        let source_channels = (buffer.channel_count() as usize).max(1);
        let frames = out.len() / channels;

        let mut frame = self.delay_frames.min(frames);
        self.delay_frames -= frame;

        while frame < frames {
            if self.position >= frame_count as f64 {
                self.finish();
                return;
            }

            let level = match self.state {
                VoiceState::Attack => {
                    self.level = (self.level + envelope.attack_step()).min(1.0);
                    if self.level >= 1.0 {
                        self.transition(VoiceState::Sustain);
                    }
                    self.level
                }
                VoiceState::Sustain => self.level,
                VoiceState::Release => {
                    self.level -= self.release_step;
                    if self.level <= 0.0 {
                        self.finish();
                        return;
                    }
                    self.level
                }
                VoiceState::Free => return,
            };

            let index = self.position as usize;
            let frac = (self.position - index as f64) as f32;
            let amplitude = self.gain * level;

            let start = frame * channels;
            for (channel, slot) in out[start..start + channels].iter_mut().enumerate() {
                // Mono buffers feed every output channel.
                let source_channel = channel % source_channels;
                let s0 = buffer.sample(index, source_channel);
                let sample = if frac == 0.0 {
                    s0
                } else {
                    let s1 = if index + 1 < frame_count {
                        buffer.sample(index + 1, source_channel)
                    } else {
                        s0
                    };
                    s0 + (s1 - s0) * frac
                };
                *slot += sample * amplitude;
            }

            self.position += self.rate;
            frame += 1;
        }

        if self.position >= frame_count as f64 {
            self.finish();
        }
    }
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("state", &self.state)
            .field("handle", &self.handle)
            .field("trigger", &self.trigger)
            .field("velocity", &self.velocity)
            .field("position", &self.position)
            .field("level", &self.level)
            .field("age", &self.age)
            .finish()
    }
}

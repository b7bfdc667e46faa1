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

//! Voice allocation and stealing.
//!
//! The pool never grows. When it is full a new trigger takes over the oldest
//! releasing voice, failing that the oldest sustaining voice, failing that the
//! oldest attacking one. Only a pool with no slots drops triggers.

use super::envelope::Envelope;
use super::event::TriggerEvent;
use super::voice::{Voice, VoiceState};

/// The outcome of starting a voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Allocation {
    /// A free slot was used.
    Free(usize),
    /// An active voice was cut to make room.
    Evicted(usize),
}

/// A fixed set of voice slots with an index free list.
pub struct VoicePool {
    voices: Vec<Voice>,
    /// Indices of free slots. Preallocated to capacity, so pushes never allocate.
    free: Vec<usize>,
    next_age: u64,
}

impl VoicePool {
    /// Creates a pool with the given number of slots.
    pub fn new(capacity: usize) -> VoicePool {
        VoicePool {
            voices: (0..capacity).map(|_| Voice::idle()).collect(),
            free: (0..capacity).rev().collect(),
            next_age: 0,
        }
    }

    /// Gets the number of slots.
    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Gets the number of non-free voices.
    pub fn active_count(&self) -> usize {
        self.voices.len() - self.free.len()
    }

    /// Gets every slot.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    fn oldest_in(&self, state: VoiceState) -> Option<usize> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, voice)| voice.state() == state)
            .min_by_key(|(_, voice)| voice.age())
            .map(|(index, _)| index)
    }

    fn allocate(&mut self) -> Option<Allocation> {
        if let Some(index) = self.free.pop() {
            return Some(Allocation::Free(index));
        }
        let victim = self
            .oldest_in(VoiceState::Release)
            .or_else(|| self.oldest_in(VoiceState::Sustain))
            .or_else(|| self.oldest_in(VoiceState::Attack))?;
        self.voices[victim].finish();
        Some(Allocation::Evicted(victim))
    }

    /// Starts a voice for the trigger. Returns None if the trigger was dropped.
    pub(super) fn start(&mut self, event: TriggerEvent, delay_frames: usize) -> Option<Allocation> {
        let allocation = self.allocate()?;
        let index = match allocation {
            Allocation::Free(index) | Allocation::Evicted(index) => index,
        };
        let age = self.next_age;
        self.next_age += 1;
        self.voices[index].start(event, delay_frames, age);
        Some(allocation)
    }

    /// Releases every attacking or sustaining voice started by the trigger.
    pub(super) fn release_trigger(&mut self, trigger: u8, envelope: &Envelope) -> usize {
        self.voices
            .iter_mut()
            .filter(|voice| voice.trigger() == trigger)
            .map(|voice| voice.release(envelope))
            .filter(|released| *released)
            .count()
    }

    /// Releases every attacking or sustaining voice.
    pub(super) fn release_all(&mut self, envelope: &Envelope) -> usize {
        self.voices
            .iter_mut()
            .map(|voice| voice.release(envelope))
            .filter(|released| *released)
            .count()
    }

    /// Mixes every active voice into the block, returning finished slots to the free list.
    pub(super) fn render(&mut self, out: &mut [f32], channels: usize, envelope: &Envelope) {
        for (index, voice) in self.voices.iter_mut().enumerate() {
            if !voice.state().is_active() {
                continue;
            }
            voice.render(out, channels, envelope);
            if !voice.state().is_active() {
                self.free.push(index);
            }
        }
    }
}

impl std::fmt::Debug for VoicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePool")
            .field("capacity", &self.capacity())
            .field("active", &self.active_count())
            .finish()
    }
}

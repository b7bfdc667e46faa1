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

use std::sync::Arc;

use super::control::VoiceHandle;
use crate::assets::AudioBuffer;

/// Events sent from the control domain to the renderer, applied in order at the
/// start of the next block.
pub(super) enum ControlEvent {
    Trigger(TriggerEvent),
    Release { trigger: u8 },
    ReleaseAll,
}

/// Everything the renderer needs to start a voice without looking anything up.
pub(super) struct TriggerEvent {
    pub handle: VoiceHandle,
    pub trigger: u8,
    pub velocity: u8,
    pub buffer: Arc<AudioBuffer>,
    pub gain: f32,
    pub rate: f64,
    /// The renderer frame the voice should start on.
    pub start_frame: u64,
}

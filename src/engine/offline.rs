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

//! Bouncing a list of triggers to audio without a device.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use super::control::{Rejected, VoiceEngine};
use super::render::Renderer;

/// A trigger placed on the offline timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledTrigger {
    pub trigger: u8,
    pub velocity: u8,
    /// The frame the voice starts on.
    pub start_frame: u64,
    /// How long the trigger is held. Held triggers play until the sample ends.
    pub length_frames: Option<u64>,
}

/// Renders the schedule from the renderer's current clock until every event has
/// been sent and every voice has finished. Releases take effect at the first
/// block boundary at or after their frame. Starts are sample accurate, except a
/// start that must wait for an earlier release of the same trigger, which moves
/// to the block that release goes out in.
pub fn render_offline(
    engine: &VoiceEngine,
    renderer: &mut Renderer,
    schedule: &[ScheduledTrigger],
) -> Result<Vec<f32>, Rejected> {
    let block_frames = renderer.max_block_frames().max(1);

    let mut starts: Vec<&ScheduledTrigger> = schedule.iter().collect();
    starts.sort_by_key(|s| s.start_frame);
    let mut releases: Vec<(u64, u8)> = schedule
        .iter()
        .filter_map(|s| s.length_frames.map(|len| (s.start_frame + len, s.trigger)))
        .collect();
    releases.sort();

    let mut output = Vec::new();
    let mut next_start = 0;
    let mut next_release = 0;
    loop {
        let clock = renderer.clock();
        let block_end = clock + block_frames as u64;

        // Events go out in frame order, a start before a release on the same frame.
        loop {
            let release = releases
                .get(next_release)
                .filter(|(frame, _)| *frame <= clock);
            let start = starts.get(next_start).filter(|scheduled| {
                scheduled.start_frame < block_end
                    && !held_back(scheduled, &releases[next_release..], clock)
            });

            match (start, release) {
                (Some(scheduled), Some((frame, _))) if scheduled.start_frame <= *frame => {
                    engine.trigger(scheduled.trigger, scheduled.velocity, scheduled.start_frame)?;
                    next_start += 1;
                }
                (_, Some((_, trigger))) => {
                    engine.release(*trigger)?;
                    next_release += 1;
                }
                (Some(scheduled), None) => {
                    engine.trigger(scheduled.trigger, scheduled.velocity, scheduled.start_frame)?;
                    next_start += 1;
                }
                (None, None) => break,
            }
        }

        output.extend_from_slice(renderer.render_block(block_frames));

        let pending = next_start < starts.len() || next_release < releases.len();
        if !pending && renderer.pool().active_count() == 0 {
            break;
        }
    }

    info!(
        triggers = schedule.len(),
        frames = output.len() / renderer.channels(),
        "Offline render complete"
    );
    Ok(output)
}

/// A start waits for a later block when a release of the same trigger falls
/// at or before it but cannot be sent yet, so that release does not cut it.
fn held_back(scheduled: &ScheduledTrigger, pending: &[(u64, u8)], clock: u64) -> bool {
    pending.iter().any(|(frame, trigger)| {
        *trigger == scheduled.trigger && *frame > clock && *frame <= scheduled.start_frame
    })
}

/// Writes interleaved samples to a 32 bit float WAV file.
pub fn write_wav(
    path: &Path,
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()
}

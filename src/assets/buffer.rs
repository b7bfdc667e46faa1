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

use std::time::Duration;

/// Decoded sample data, interleaved. Immutable once created and shared between
/// the resolver cache and any voices playing it.
pub struct AudioBuffer {
    samples: Vec<f32>,
    channel_count: u16,
    sample_rate: u32,
    frame_count: usize,
}

impl AudioBuffer {
    /// Creates a buffer from interleaved samples. A trailing partial frame is ignored.
    pub fn new(samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> AudioBuffer {
        let frame_count = if channel_count == 0 {
            0
        } else {
            samples.len() / channel_count as usize
        };
        AudioBuffer {
            samples,
            channel_count,
            sample_rate,
            frame_count,
        }
    }

    /// Gets the interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Gets the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Gets the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Gets the number of frames.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Returns the sample for the given frame and channel, or silence past the end.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        self.samples
            .get(frame * self.channel_count as usize + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Gets the play time of the buffer at its own sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count as f64 / self.sample_rate as f64)
    }

    /// Returns the memory held by the sample data in bytes.
    pub fn memory_size(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }

    /// Returns a copy of this buffer converted to the target rate with linear interpolation.
    pub fn resampled(&self, target_rate: u32) -> AudioBuffer {
        if target_rate == self.sample_rate || self.sample_rate == 0 || self.channel_count == 0 {
            return AudioBuffer::new(self.samples.clone(), self.channel_count, self.sample_rate);
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let target_frames = (self.frame_count as f64 * ratio).ceil() as usize;
        let channels = self.channel_count as usize;

        let mut output = Vec::with_capacity(target_frames * channels);
        for target_frame in 0..target_frames {
            let source_pos = target_frame as f64 / ratio;
            let source_frame = source_pos.floor() as usize;
            let frac = source_pos.fract() as f32;

            for channel in 0..channels {
                let s0 = self.sample(source_frame, channel);
                let s1 = if source_frame + 1 < self.frame_count {
                    self.sample(source_frame + 1, channel)
                } else {
                    s0
                };
                output.push(s0 + (s1 - s0) * frac);
            }
        }

        AudioBuffer::new(output, self.channel_count, target_rate)
    }
}

impl std::fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("channel_count", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames() {
        let buffer = AudioBuffer::new(vec![0.1, 0.2, 0.3, 0.4, 0.5], 2, 44100);
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.sample(1, 0), 0.3);
        assert_eq!(buffer.sample(1, 1), 0.4);
        assert_eq!(buffer.sample(5, 0), 0.0);
        assert_eq!(buffer.memory_size(), 20);
    }

    #[test]
    fn resampled_upsample() {
        let buffer = AudioBuffer::new(vec![0.0, 1.0, 0.0, -1.0], 1, 22050);
        let resampled = buffer.resampled(44100);

        assert_eq!(resampled.sample_rate(), 44100);
        assert_eq!(resampled.frame_count(), 8);
        assert_eq!(resampled.samples()[0], 0.0);
        assert_eq!(resampled.samples()[1], 0.5);
        assert_eq!(resampled.samples()[2], 1.0);
        assert_eq!(resampled.samples()[3], 0.5);
        assert_eq!(resampled.samples()[6], -1.0);
        // The last frame holds rather than interpolating into silence.
        assert_eq!(resampled.samples()[7], -1.0);
    }

    #[test]
    fn resampled_keeps_channels_apart() {
        let buffer = AudioBuffer::new(vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0], 2, 48000);
        let resampled = buffer.resampled(44100);
        assert_eq!(resampled.channel_count(), 2);
        for frame in 0..resampled.frame_count() {
            assert_eq!(resampled.sample(frame, 0), 1.0);
            assert_eq!(resampled.sample(frame, 1), -1.0);
        }
    }

    #[test]
    fn resampled_same_rate() {
        let buffer = AudioBuffer::new(vec![0.25, 0.5], 1, 44100);
        let resampled = buffer.resampled(44100);
        assert_eq!(resampled.samples(), buffer.samples());
    }
}

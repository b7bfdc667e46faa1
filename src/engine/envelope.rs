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

/// A linear attack/release envelope, in frames. Sustain holds at full level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    attack_frames: u32,
    release_frames: u32,
}

impl Envelope {
    /// Creates an envelope from durations at the given sample rate.
    pub fn new(attack: Duration, release: Duration, sample_rate: u32) -> Envelope {
        let frames = |d: Duration| (d.as_secs_f64() * sample_rate as f64).round() as u32;
        Envelope {
            attack_frames: frames(attack),
            release_frames: frames(release),
        }
    }

    /// Creates an envelope from frame counts.
    pub fn from_frames(attack_frames: u32, release_frames: u32) -> Envelope {
        Envelope {
            attack_frames,
            release_frames,
        }
    }

    /// Gets the attack length in frames.
    pub fn attack_frames(&self) -> u32 {
        self.attack_frames
    }

    /// Gets the release length in frames.
    pub fn release_frames(&self) -> u32 {
        self.release_frames
    }

    /// Returns the per-frame level increase during attack.
    #[inline]
    pub fn attack_step(&self) -> f32 {
        if self.attack_frames == 0 {
            1.0
        } else {
            1.0 / self.attack_frames as f32
        }
    }

    /// Returns the per-frame level decrease for a release starting at the given level.
    #[inline]
    pub fn release_step(&self, level: f32) -> f32 {
        if self.release_frames == 0 {
            f32::INFINITY
        } else {
            level / self.release_frames as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn frames() {
        let envelope = Envelope::new(Duration::from_millis(10), Duration::from_millis(50), 48000);
        assert_eq!(envelope.attack_frames(), 480);
        assert_eq!(envelope.release_frames(), 2400);
        assert_eq!(envelope.release_step(0.5), 0.5 / 2400.0);
    }

    #[test]
    fn instant() {
        let envelope = Envelope::new(Duration::ZERO, Duration::ZERO, 44100);
        assert_eq!(envelope.attack_step(), 1.0);
        assert!(envelope.release_step(1.0).is_infinite());
    }
}

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

//! The runtime of a generated standalone instrument.

use std::error::Error;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::audio;
use crate::config::Settings;
use crate::engine::VoiceEngine;
use crate::instrument::Instrument;

/// Time between auditioned entries when no MIDI input is connected.
const AUDITION_SPACING: Duration = Duration::from_millis(600);

/// Velocity used for auditioning.
const AUDITION_VELOCITY: u8 = 100;

/// Loads the instrument, starts audio output and plays notes from the named MIDI
/// input until Enter is pressed. Without a MIDI input every entry is auditioned
/// once at its root trigger.
pub fn run(
    mapping: &str,
    assets: &Path,
    settings: &Settings,
    midi_device: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let instrument = Instrument::from_dir(mapping, assets, settings)?;
    let (engine, renderer) = instrument.into_parts();
    let engine = Arc::new(engine);

    let stream = audio::start_output(settings.audio_device(), renderer)?;
    info!(device = stream.device_name(), "Instrument playing");

    let _connection = match midi_device {
        Some(name) => Some(crate::midi::connect_input(name, engine.clone())?),
        None => {
            audition(&engine);
            None
        }
    };

    println!("Press Enter to stop.");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    if let Err(e) = engine.release_all() {
        warn!(err = %e, "Unable to release voices");
    }
    // Let the release tails play out.
    thread::sleep(Duration::from_millis(200));

    let stats = engine.stats();
    if stats.evictions() > 0 || stats.dropped_triggers() > 0 {
        warn!(
            evictions = stats.evictions(),
            dropped_triggers = stats.dropped_triggers(),
            "Polyphony was exceeded during playback"
        );
    }
    info!(frames = stats.frames_rendered(), "Instrument stopped");
    Ok(())
}

fn audition(engine: &VoiceEngine) {
    let roots: Vec<u8> = engine
        .model()
        .entries()
        .iter()
        .map(|entry| entry.root_trigger())
        .collect();

    for root in roots {
        if let Err(e) = engine.trigger(root, AUDITION_VELOCITY, engine.now()) {
            warn!(trigger = root, err = %e, "Unable to audition entry");
            continue;
        }
        thread::sleep(AUDITION_SPACING);
        if let Err(e) = engine.release(root) {
            warn!(trigger = root, err = %e, "Unable to release auditioned entry");
        }
    }
}

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

//! Live MIDI input feeding the control half of the engine.

use std::error::Error;
use std::sync::Arc;

use midir::{MidiInput, MidiInputConnection};
use tracing::{debug, info};

use crate::engine::VoiceEngine;

/// Lists the names of the available MIDI input ports, sorted.
pub fn list_input_devices() -> Result<Vec<String>, Box<dyn Error>> {
    let input = MidiInput::new("samplesmith input listing")?;
    let mut names = input
        .ports()
        .iter()
        .map(|port| input.port_name(port))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    names.dedup();
    Ok(names)
}

/// Connects to the named MIDI input and forwards note on and note off messages to
/// the engine. Input stops when the returned connection is dropped.
pub fn connect_input(
    name: &str,
    engine: Arc<VoiceEngine>,
) -> Result<MidiInputConnection<()>, Box<dyn Error>> {
    let mut input = MidiInput::new("samplesmith input")?;
    input.ignore(midir::Ignore::All);

    let port = input
        .ports()
        .into_iter()
        .find(|port| input.port_name(port).map(|n| n.trim() == name).unwrap_or(false))
        .ok_or_else(|| format!("no MIDI input found with name {}", name))?;

    let connection = input.connect(
        &port,
        "samplesmith input watcher",
        move |_, raw_event, _| {
            debug!(event = ?raw_event, "Received MIDI event");
            engine.process_midi_event(raw_event);
        },
        (),
    )?;
    info!(device = name, "Listening for MIDI input");
    Ok(connection)
}

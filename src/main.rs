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

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use samplesmith::assets::FsAssetStore;
use samplesmith::builder::CommandCollaborator;
use samplesmith::config::Settings;
use samplesmith::emit::ASSETS_DIR;
use samplesmith::engine::offline::{self, ScheduledTrigger};
use samplesmith::export::ExportSession;
use samplesmith::instrument::Instrument;
use samplesmith::mapping::MappingModel;
use samplesmith::{audio, midi, standalone};

/// Velocity used for notes given without one.
const DEFAULT_VELOCITY: u8 = 100;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Turns a sample mapping into a playable instrument."
)]
struct Cli {
    /// The settings file. Defaults to samplesmith.{yaml,toml,json} in the working directory.
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generates (and optionally builds) a project from an export directory.
    Export {
        /// The export ID, a directory under the exports root.
        export_id: String,
        /// The target kind: standalone or plugin.
        #[arg(short, long, default_value = "standalone")]
        target: String,
        /// Runs the configured build command on the generated project.
        #[arg(short, long)]
        build: bool,
    },
    /// Validates a mapping file and checks that its assets exist.
    Validate {
        /// The path to the mapping file.
        mapping: PathBuf,
        /// The asset directory. Defaults to the assets directory next to the mapping.
        #[arg(short, long)]
        assets: Option<PathBuf>,
        /// Prints the resolved entries as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Renders a sequence of notes to a WAV file.
    Render {
        /// The path to the mapping file.
        mapping: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
        /// A note to play, as <TRIGGER> or <TRIGGER>:<VELOCITY>. Repeat for a sequence.
        #[arg(short, long = "note", required = true)]
        notes: Vec<String>,
        /// The asset directory. Defaults to the assets directory next to the mapping.
        #[arg(short, long)]
        assets: Option<PathBuf>,
        /// Time between note starts.
        #[arg(long, default_value = "500ms")]
        spacing: String,
        /// How long each note is held. Notes play to the end of their sample when unset.
        #[arg(long)]
        hold: Option<String>,
    },
    /// Plays a mapping through the audio interface.
    Play {
        /// The path to the mapping file.
        mapping: PathBuf,
        /// The asset directory. Defaults to the assets directory next to the mapping.
        #[arg(short, long)]
        assets: Option<PathBuf>,
        /// The MIDI input to play from.
        #[arg(short, long)]
        midi_device: Option<String>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
}

fn assets_dir(mapping: &Path, assets: Option<PathBuf>) -> PathBuf {
    assets.unwrap_or_else(|| {
        mapping
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(ASSETS_DIR)
    })
}

fn parse_note(note: &str) -> Result<(u8, u8), Box<dyn Error>> {
    let (trigger, velocity) = match note.split_once(':') {
        Some((trigger, velocity)) => (trigger, velocity.parse::<u8>()?),
        None => (note, DEFAULT_VELOCITY),
    };
    let trigger = trigger.parse::<u8>()?;
    if trigger > 127 || velocity > 127 {
        return Err(format!("note '{}' is out of range", note).into());
    }
    Ok((trigger, velocity))
}

fn parse_duration(value: &str) -> Result<Duration, Box<dyn Error>> {
    Ok(DurationString::from_string(value.to_string())?.into())
}

fn frames(duration: Duration, sample_rate: u32) -> u64 {
    (duration.as_secs_f64() * sample_rate as f64).round() as u64
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.settings.as_deref())?;

    match cli.command {
        Commands::Export {
            export_id,
            target,
            build,
        } => {
            let session = ExportSession::new(&settings, &export_id);
            let mut status = session.subscribe();
            let printer = tokio::spawn(async move {
                while status.changed().await.is_ok() {
                    let current = status.borrow_and_update().clone();
                    println!("[{:>3}%] {}", current.progress, current.message);
                }
            });

            let collaborator = build.then(|| CommandCollaborator::new(settings.build().clone()));
            let result = session.run(&target, collaborator.as_ref()).await;
            drop(session);
            printer.await?;

            let report = result?;
            println!("Project written to {}", report.project_dir.display());
            if let Some(build) = report.build {
                for line in build.stdout {
                    println!("{}", line);
                }
            }
        }
        Commands::Validate {
            mapping,
            assets,
            json,
        } => {
            let raw = fs::read_to_string(&mapping)?;
            let store = FsAssetStore::new(assets_dir(&mapping, assets));
            let model = MappingModel::load_checked(&raw, &store)?.with_tie_break(settings.tie_break());

            if json {
                println!("{}", serde_json::to_string_pretty(model.entries())?);
                return Ok(());
            }

            println!(
                "{}: {} entries, {} assets",
                model.name().unwrap_or("Unnamed mapping"),
                model.entries().len(),
                model.asset_paths().len()
            );
            for entry in model.entries() {
                println!(
                    "- triggers {:?} velocities {:?} root {} -> {}",
                    entry.triggers(),
                    entry.velocities(),
                    entry.root_trigger(),
                    entry.asset_path()
                );
            }
        }
        Commands::Render {
            mapping,
            output,
            notes,
            assets,
            spacing,
            hold,
        } => {
            let raw = fs::read_to_string(&mapping)?;
            let instrument = Instrument::from_dir(&raw, &assets_dir(&mapping, assets), &settings)?;
            let (engine, mut renderer) = instrument.into_parts();
            let sample_rate = renderer.sample_rate();

            let spacing = frames(parse_duration(&spacing)?, sample_rate);
            let hold = match hold {
                Some(hold) => Some(frames(parse_duration(&hold)?, sample_rate)),
                None => None,
            };
            let mut schedule = Vec::with_capacity(notes.len());
            for (i, note) in notes.iter().enumerate() {
                let (trigger, velocity) = parse_note(note)?;
                schedule.push(ScheduledTrigger {
                    trigger,
                    velocity,
                    start_frame: i as u64 * spacing,
                    length_frames: hold,
                });
            }

            let samples = offline::render_offline(&engine, &mut renderer, &schedule)?;
            offline::write_wav(&output, &samples, renderer.channels() as u16, sample_rate)?;
            println!(
                "Wrote {} frames to {}",
                samples.len() / renderer.channels(),
                output.display()
            );
        }
        Commands::Play {
            mapping,
            assets,
            midi_device,
        } => {
            let raw = fs::read_to_string(&mapping)?;
            standalone::run(
                &raw,
                &assets_dir(&mapping, assets),
                &settings,
                midi_device.as_deref(),
            )?;
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_input_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
    }

    Ok(())
}

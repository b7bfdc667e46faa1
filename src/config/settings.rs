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

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use super::mapping::EngineDefaults;
use crate::emit::TargetKind;
use crate::engine::EngineSettings;
use crate::mapping::TieBreak;

/// The settings file looked up in the working directory when no path is given.
pub const DEFAULT_SETTINGS_NAME: &str = "samplesmith";

/// Prefix for settings overrides taken from the environment, e.g. SAMPLESMITH_POLYPHONY=64.
/// Nested keys use a double underscore: SAMPLESMITH_BUILD__PLUGIN.
const ENV_PREFIX: &str = "SAMPLESMITH";

/// Default output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default output channel count.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Default maximum number of concurrent voices.
pub const DEFAULT_POLYPHONY: usize = 32;

/// Default largest block the renderer is sized for.
pub const DEFAULT_MAX_BLOCK_FRAMES: usize = 1024;

/// Default capacity of the control to render event queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

const DEFAULT_ATTACK: &str = "0ms";
const DEFAULT_RELEASE: &str = "50ms";

/// Application settings, layered from defaults, an optional settings file and
/// SAMPLESMITH_* environment variables.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Settings {
    /// The directory holding one subdirectory per export.
    exports_root: PathBuf,

    /// The output sample rate. Decoded assets are converted to this rate.
    sample_rate: u32,

    /// The number of interleaved output channels.
    channels: u16,

    /// Maximum number of concurrent voices.
    polyphony: usize,

    /// The largest block the renderer preallocates for.
    max_block_frames: usize,

    /// Capacity of the trigger/release event queue.
    event_queue_capacity: usize,

    /// Envelope attack time as a duration string.
    attack: String,

    /// Envelope release time as a duration string.
    release: String,

    /// Gain applied to every voice on top of velocity.
    master_gain: f32,

    /// How overlapping mapping entries are resolved.
    tie_break: TieBreak,

    /// The build commands run for each target.
    build: BuildCommands,

    /// The audio output device to play through. The system default when unset.
    audio_device: Option<String>,

    /// The dependency spec generated projects use for this crate, e.g. `"0.1"`.
    /// A path to this crate's source when unset.
    runtime_dependency: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            exports_root: PathBuf::from("exports"),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            polyphony: DEFAULT_POLYPHONY,
            max_block_frames: DEFAULT_MAX_BLOCK_FRAMES,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            attack: DEFAULT_ATTACK.to_string(),
            release: DEFAULT_RELEASE.to_string(),
            master_gain: 1.0,
            tie_break: TieBreak::default(),
            build: BuildCommands::default(),
            audio_device: None,
            runtime_dependency: None,
        }
    }
}

impl Settings {
    /// Loads settings from the given file, or from `samplesmith.{yaml,toml,json}` in the
    /// working directory if it exists. Environment variables override either.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let builder = match path {
            Some(path) => Config::builder().add_source(File::from(path)),
            None => Config::builder().add_source(File::with_name(DEFAULT_SETTINGS_NAME).required(false)),
        };
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Settings, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.channels == 0 {
            return Err(ConfigError::Invalid {
                field: "channels",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "event_queue_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        parse_duration("attack", &self.attack)?;
        parse_duration("release", &self.release)?;
        Ok(())
    }

    /// Gets the exports root.
    pub fn exports_root(&self) -> &Path {
        &self.exports_root
    }

    /// Gets the output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Gets the output channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Gets the tie-break policy for overlapping entries.
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Gets the build commands.
    pub fn build(&self) -> &BuildCommands {
        &self.build
    }

    /// Gets the configured audio output device.
    pub fn audio_device(&self) -> Option<&str> {
        self.audio_device.as_deref()
    }

    /// Gets the configured runtime dependency spec for generated projects.
    pub fn runtime_dependency(&self) -> Option<&str> {
        self.runtime_dependency.as_deref()
    }

    /// Returns the engine settings, with any mapping-level engine defaults taking
    /// precedence over the application settings.
    pub fn engine_settings(
        &self,
        overrides: Option<&EngineDefaults>,
    ) -> Result<EngineSettings, ConfigError> {
        let attack = overrides
            .and_then(|o| o.attack())
            .unwrap_or(&self.attack);
        let release = overrides
            .and_then(|o| o.release())
            .unwrap_or(&self.release);
        let master_gain = overrides
            .and_then(|o| o.master_gain())
            .unwrap_or(self.master_gain);

        Ok(EngineSettings {
            sample_rate: self.sample_rate,
            channels: self.channels,
            polyphony: self.polyphony.max(1),
            max_block_frames: self.max_block_frames.max(1),
            event_queue_capacity: self.event_queue_capacity,
            attack: parse_duration("attack", attack)?,
            release: parse_duration("release", release)?,
            master_gain,
        })
    }

    /// Sets the output sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Sets the largest block the renderer is sized for.
    pub fn with_max_block_frames(mut self, max_block_frames: usize) -> Self {
        self.max_block_frames = max_block_frames;
        self
    }

    /// Sets the exports root.
    pub fn with_exports_root(mut self, exports_root: PathBuf) -> Self {
        self.exports_root = exports_root;
        self
    }

    /// Sets the tie-break policy.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    DurationString::from_string(value.to_string())
        .map(Duration::from)
        .map_err(|e| ConfigError::Duration {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// The command lines run in a written scaffold directory to build each target.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct BuildCommands {
    standalone: Vec<String>,
    plugin: Vec<String>,
}

impl Default for BuildCommands {
    fn default() -> Self {
        let cargo_release = vec![
            "cargo".to_string(),
            "build".to_string(),
            "--release".to_string(),
        ];
        BuildCommands {
            standalone: cargo_release.clone(),
            plugin: cargo_release,
        }
    }
}

impl BuildCommands {
    /// Creates build commands from explicit command lines.
    pub fn new(standalone: Vec<String>, plugin: Vec<String>) -> Self {
        BuildCommands { standalone, plugin }
    }

    /// Gets the command line for the given target.
    pub fn for_target(&self, target: TargetKind) -> &[String] {
        match target {
            TargetKind::Standalone => &self.standalone,
            TargetKind::Plugin => &self.plugin,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::mapping::MappingDocument;

    #[test]
    fn defaults() {
        let settings = Settings::from_yaml("{}").unwrap();
        assert_eq!(settings.sample_rate(), DEFAULT_SAMPLE_RATE);
        assert_eq!(settings.channels(), DEFAULT_CHANNELS);
        assert_eq!(settings.tie_break(), TieBreak::FirstDeclared);
        assert_eq!(
            settings.build().for_target(TargetKind::Plugin),
            &["cargo", "build", "--release"]
        );

        let engine = settings.engine_settings(None).unwrap();
        assert_eq!(engine.polyphony, DEFAULT_POLYPHONY);
        assert_eq!(engine.attack, Duration::ZERO);
        assert_eq!(engine.release, Duration::from_millis(50));
        assert_eq!(engine.master_gain, 1.0);
    }

    #[test]
    fn file_values() {
        let settings = Settings::from_yaml(
            r#"
            sample_rate: 48000
            polyphony: 8
            release: 200ms
            tie_break: last_declared
            build:
              standalone: ["make", "standalone"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.sample_rate(), 48000);
        assert_eq!(settings.tie_break(), TieBreak::LastDeclared);
        assert_eq!(
            settings.build().for_target(TargetKind::Standalone),
            &["make", "standalone"]
        );
        // Unset command lines keep their default.
        assert_eq!(
            settings.build().for_target(TargetKind::Plugin),
            &["cargo", "build", "--release"]
        );

        let engine = settings.engine_settings(None).unwrap();
        assert_eq!(engine.polyphony, 8);
        assert_eq!(engine.release, Duration::from_millis(200));
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "polyphony: 8\nsample_rate: 48000\n").unwrap();

        std::env::set_var("SAMPLESMITH_POLYPHONY", "7");
        std::env::set_var("SAMPLESMITH_TIE_BREAK", "last_declared");
        let settings = Settings::load(Some(&path));
        std::env::remove_var("SAMPLESMITH_POLYPHONY");
        std::env::remove_var("SAMPLESMITH_TIE_BREAK");

        let settings = settings.unwrap();
        assert_eq!(settings.sample_rate(), 48000);
        assert_eq!(settings.tie_break(), TieBreak::LastDeclared);
        assert_eq!(settings.engine_settings(None).unwrap().polyphony, 7);
    }

    #[test]
    fn runtime_dependency_override() {
        assert_eq!(Settings::default().runtime_dependency(), None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(
            &path,
            "runtime_dependency: '{ git = \"https://example.com/samplesmith\" }'\n",
        )
        .unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(
            settings.runtime_dependency(),
            Some("{ git = \"https://example.com/samplesmith\" }")
        );
    }

    #[test]
    fn invalid_duration() {
        let result = Settings::from_yaml("attack: soon");
        assert!(matches!(
            result,
            Err(ConfigError::Duration { field: "attack", .. })
        ));
    }

    #[test]
    fn invalid_sample_rate() {
        assert!(matches!(
            Settings::from_yaml("sample_rate: 0"),
            Err(ConfigError::Invalid {
                field: "sample_rate",
                ..
            })
        ));
    }

    #[test]
    fn mapping_overrides() {
        let document = MappingDocument::parse(
            r#"
            engine:
              master_gain: 0.5
              release: 1s
            entries: []
            "#,
        )
        .unwrap();

        let settings = Settings::default();
        let engine = settings.engine_settings(document.engine()).unwrap();
        assert_eq!(engine.master_gain, 0.5);
        assert_eq!(engine.release, Duration::from_secs(1));
        assert_eq!(engine.attack, Duration::ZERO);
    }
}

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

use super::target::TargetKind;

/// The file name the mapping payload is written to in a generated project.
pub const MAPPING_FILE: &str = "mapping.yaml";

/// The directory assets are copied to in a generated project.
pub const ASSETS_DIR: &str = "assets";

/// Returns the dependency spec generated projects use for this crate: a path
/// to the source it was built from.
pub fn default_runtime_dependency() -> String {
    format!("{{ path = '{}' }}", env!("CARGO_MANIFEST_DIR"))
}

const STANDALONE_CARGO_TOML: &str = r#"[package]
name = "{{package_name}}"
version = "0.1.0"
edition = "2021"

[dependencies]
samplesmith = {{runtime_dependency}}
tracing-subscriber = "0.3"
"#;

const STANDALONE_MAIN: &str = r#"use std::error::Error;
use std::path::Path;

use samplesmith::config::Settings;

const MAPPING: &str = include_str!("../mapping.yaml");

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let settings = Settings::load(None)?;
    let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
    let midi_device = std::env::args().nth(1);
    samplesmith::standalone::run(MAPPING, &assets, &settings, midi_device.as_deref())
}
"#;

const PLUGIN_CARGO_TOML: &str = r#"[package]
name = "{{package_name}}"
version = "0.1.0"
edition = "2021"

[lib]
crate-type = ["cdylib"]

[dependencies]
samplesmith = {{runtime_dependency}}
"#;

const PLUGIN_LIB: &str = r#"//! Render entry points for a plugin host wrapper. The wrapper creates one
//! instance per plugin instance, forwards notes from its event thread and calls
//! render from its audio thread. Note calls only touch the control half; the
//! renderer is reached through render alone.

use std::cell::UnsafeCell;
use std::path::Path;
use std::slice;

use samplesmith::config::Settings;
use samplesmith::engine::{Renderer, VoiceEngine};
use samplesmith::instrument::Instrument;

const MAPPING: &str = include_str!("../mapping.yaml");

pub struct Plugin {
    engine: VoiceEngine,
    /// Only `{{symbol}}_render` dereferences this, from one thread at a time.
    renderer: UnsafeCell<Renderer>,
    channels: usize,
}

/// Creates an instance, or returns null if the mapping or its assets fail to load.
#[no_mangle]
pub extern "C" fn {{symbol}}_create(sample_rate: u32, max_block_frames: u32) -> *mut Plugin {
    let settings = Settings::default()
        .with_sample_rate(sample_rate)
        .with_max_block_frames(max_block_frames as usize);
    let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
    match Instrument::from_dir(MAPPING, &assets, &settings) {
        Ok(instrument) => {
            let channels = instrument.channels();
            let (engine, renderer) = instrument.into_parts();
            Box::into_raw(Box::new(Plugin {
                engine,
                renderer: UnsafeCell::new(renderer),
                channels,
            }))
        }
        Err(_) => std::ptr::null_mut(),
    }
}

/// Returns the number of interleaved output channels.
///
/// # Safety
/// `plugin` must be null or come from `{{symbol}}_create`.
#[no_mangle]
pub unsafe extern "C" fn {{symbol}}_channels(plugin: *const Plugin) -> u32 {
    match plugin.as_ref() {
        Some(plugin) => plugin.channels as u32,
        None => 0,
    }
}

/// # Safety
/// `plugin` must be null or come from `{{symbol}}_create`.
#[no_mangle]
pub unsafe extern "C" fn {{symbol}}_note_on(plugin: *const Plugin, note: u8, velocity: u8) -> bool {
    let Some(plugin) = plugin.as_ref() else {
        return false;
    };
    plugin
        .engine
        .trigger(note, velocity, plugin.engine.now())
        .is_ok()
}

/// # Safety
/// `plugin` must be null or come from `{{symbol}}_create`.
#[no_mangle]
pub unsafe extern "C" fn {{symbol}}_note_off(plugin: *const Plugin, note: u8) -> bool {
    match plugin.as_ref() {
        Some(plugin) => plugin.engine.release(note).is_ok(),
        None => false,
    }
}

/// Renders `frames` interleaved frames into `out`. May run concurrently with the
/// note calls, but never with itself.
///
/// # Safety
/// `plugin` must be null or come from `{{symbol}}_create`, calls must not overlap
/// each other, and `out` must hold `frames * {{symbol}}_channels(plugin)` floats.
#[no_mangle]
pub unsafe extern "C" fn {{symbol}}_render(plugin: *const Plugin, out: *mut f32, frames: u32) {
    let Some(plugin) = plugin.as_ref() else {
        return;
    };
    if out.is_null() {
        return;
    }
    let out = slice::from_raw_parts_mut(out, frames as usize * plugin.channels);
    let renderer = &mut *plugin.renderer.get();
    renderer.render_into(out);
}

/// # Safety
/// `plugin` must be null or come from `{{symbol}}_create`, and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn {{symbol}}_destroy(plugin: *mut Plugin) {
    if !plugin.is_null() {
        drop(Box::from_raw(plugin));
    }
}
"#;

/// A text file of a generated project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaffoldFile {
    path: PathBuf,
    contents: String,
}

impl ScaffoldFile {
    fn new(
        path: impl AsRef<Path>,
        template: &str,
        package_name: &str,
        runtime_dependency: &str,
    ) -> ScaffoldFile {
        ScaffoldFile {
            path: path.as_ref().to_path_buf(),
            contents: template
                .replace("{{package_name}}", package_name)
                .replace("{{symbol}}", &package_name.replace('-', "_"))
                .replace("{{runtime_dependency}}", runtime_dependency),
        }
    }

    /// Gets the path relative to the project root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the file contents.
    pub fn contents(&self) -> &str {
        &self.contents
    }
}

/// Returns the project files for the target.
pub(super) fn scaffold(
    target: TargetKind,
    package_name: &str,
    runtime_dependency: &str,
) -> Vec<ScaffoldFile> {
    let (manifest, source, template) = match target {
        TargetKind::Standalone => (STANDALONE_CARGO_TOML, "main.rs", STANDALONE_MAIN),
        TargetKind::Plugin => (PLUGIN_CARGO_TOML, "lib.rs", PLUGIN_LIB),
    };
    vec![
        ScaffoldFile::new("Cargo.toml", manifest, package_name, runtime_dependency),
        ScaffoldFile::new(
            Path::new("src").join(source),
            template,
            package_name,
            runtime_dependency,
        ),
    ]
}

/// Turns an instrument name into a crate name.
pub(super) fn package_name(name: Option<&str>) -> String {
    let mut package = String::new();
    for c in name.unwrap_or_default().chars() {
        if c.is_ascii_alphanumeric() {
            package.push(c.to_ascii_lowercase());
        } else if !package.is_empty() && !package.ends_with('-') {
            package.push('-');
        }
    }
    let package = package.trim_end_matches('-');

    match package.chars().next() {
        None => "sampler-instrument".to_string(),
        Some(c) if c.is_ascii_digit() => format!("sampler-{}", package),
        Some(_) => package.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_names() {
        assert_eq!(package_name(Some("Grand Piano (dry)")), "grand-piano-dry");
        assert_eq!(package_name(Some("  808 Kit!")), "sampler-808-kit");
        assert_eq!(package_name(Some("---")), "sampler-instrument");
        assert_eq!(package_name(None), "sampler-instrument");
    }

    #[test]
    fn plugin_symbols() {
        let files = scaffold(TargetKind::Plugin, "grand-piano", "\"0.1\"");
        let lib = files
            .iter()
            .find(|f| f.path() == Path::new("src").join("lib.rs"))
            .unwrap();
        assert!(lib.contents().contains("pub extern \"C\" fn grand_piano_create("));
        assert!(lib.contents().contains("fn grand_piano_render("));
        assert!(!lib.contents().contains("{{"));

        let cargo = files.iter().find(|f| f.path() == Path::new("Cargo.toml")).unwrap();
        assert!(cargo.contents().contains("name = \"grand-piano\""));
        assert!(cargo.contents().contains("crate-type = [\"cdylib\"]"));
        assert!(cargo.contents().contains("samplesmith = \"0.1\""));
    }

    #[test]
    fn plugin_render_is_the_only_renderer_access() {
        let files = scaffold(TargetKind::Plugin, "kit", "\"0.1\"");
        let lib = files[1].contents();
        assert!(lib.contains("renderer: UnsafeCell<Renderer>"));
        assert!(lib.contains("fn kit_render(plugin: *const Plugin"));
        assert!(!lib.contains("as_mut()"));
        assert_eq!(lib.matches(".renderer.get()").count(), 1);
    }

    #[test]
    fn runtime_dependency_is_a_path() {
        let dependency = default_runtime_dependency();
        assert!(dependency.starts_with("{ path = '"));
        assert!(dependency.contains(env!("CARGO_MANIFEST_DIR")));

        let files = scaffold(TargetKind::Standalone, "kit", &dependency);
        assert!(files[0]
            .contents()
            .contains(&format!("samplesmith = {}", dependency)));
    }

    #[test]
    fn standalone_files() {
        let files = scaffold(TargetKind::Standalone, "kit", "\"0.1\"");
        let paths: Vec<&Path> = files.iter().map(|f| f.path()).collect();
        assert_eq!(paths, vec![Path::new("Cargo.toml"), Path::new("src/main.rs")]);
        assert!(files[1].contents().contains("samplesmith::standalone::run"));
    }
}

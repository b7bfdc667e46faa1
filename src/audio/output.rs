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
use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use tracing::{error, info};

use super::thread_priority::{
    callback_thread_priority, configure_audio_thread_priority, rt_audio_enabled,
};
use crate::engine::Renderer;

/// An output device as reported by the host.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    /// The name of the device.
    pub name: String,
    /// The maximum number of output channels the device supports.
    pub max_channels: u16,
    /// The host the device belongs to.
    pub host: &'static str,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// Lists output devices on every available host, sorted by name.
pub fn list_devices() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = %e,
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(configs) = device.supported_output_configs() else {
                continue;
            };
            let max_channels = configs.map(|c| c.channels()).max().unwrap_or(0);
            if max_channels > 0 {
                devices.push(DeviceInfo {
                    name: device.name()?,
                    max_channels,
                    host: host_id.name(),
                });
            }
        }
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

fn find_device(name: Option<&str>) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_output_device()
            .ok_or_else(|| "no default output device".into()),
        Some(name) => {
            for device in host.output_devices()? {
                if device.name().map(|n| n.trim() == name).unwrap_or(false) {
                    return Ok(device);
                }
            }
            Err(format!("no output device found with name {}", name).into())
        }
    }
}

/// A running output stream. Playback stops when this is dropped.
pub struct OutputStream {
    device_name: String,
    stream: cpal::Stream,
}

impl OutputStream {
    /// Gets the name of the device being played through.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Pauses the stream.
    pub fn pause(&self) -> Result<(), Box<dyn Error>> {
        self.stream.pause()?;
        Ok(())
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream")
            .field("device_name", &self.device_name)
            .finish()
    }
}

/// Opens the named device (or the default one) at the renderer's rate and channel
/// count and moves the renderer into the output callback.
pub fn start_output(
    device_name: Option<&str>,
    renderer: Renderer,
) -> Result<OutputStream, Box<dyn Error>> {
    let device = find_device(device_name)?;
    let name = device.name()?;
    let sample_format = device.default_output_config()?.sample_format();
    let config = cpal::StreamConfig {
        channels: renderer.channels() as u16,
        sample_rate: cpal::SampleRate(renderer.sample_rate()),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_f32_stream(&device, &config, renderer)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, renderer)?,
        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, renderer)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, renderer)?,
        other => return Err(format!("unsupported sample format {}", other).into()),
    };
    stream.play()?;

    info!(
        device = %name,
        channels = config.channels,
        sample_rate = config.sample_rate.0,
        format = %sample_format,
        "Output stream started"
    );
    Ok(OutputStream {
        device_name: name,
        stream,
    })
}

/// Float devices are rendered into directly.
fn build_f32_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let priority = callback_thread_priority();
    let rt_audio = rt_audio_enabled();
    let mut priority_set = false;
    device.build_output_stream(
        config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            configure_audio_thread_priority(&priority, rt_audio, &mut priority_set);
            renderer.render_into(data);
        },
        |err| error!("Output stream error: {}", err),
        None,
    )
}

/// Integer devices are rendered in chunks through a preallocated float buffer.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let priority = callback_thread_priority();
    let rt_audio = rt_audio_enabled();
    let mut priority_set = false;
    let chunk = renderer.max_block_frames() * renderer.channels();
    let mut scratch = vec![0.0f32; chunk];
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            configure_audio_thread_priority(&priority, rt_audio, &mut priority_set);
            for out in data.chunks_mut(chunk) {
                let rendered = &mut scratch[..out.len()];
                renderer.render_into(rendered);
                for (dst, src) in out.iter_mut().zip(rendered.iter()) {
                    *dst = T::from_sample(*src);
                }
            }
        },
        |err| error!("Output stream error: {}", err),
        None,
    )
}

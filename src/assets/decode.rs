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

use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::warn;

use super::buffer::AudioBuffer;
use super::error::AssetError;

/// Decodes an encoded asset into an interleaved f32 buffer at the asset's own rate.
/// Supports WAV, FLAC, MP3, OGG and the other formats symphonia knows.
pub(super) fn decode(path: &str, bytes: Vec<u8>) -> Result<AudioBuffer, AssetError> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AssetError::unsupported_format(path, e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AssetError::unsupported_format(path, "no audio track"))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| AssetError::unsupported_format(path, e))?;

    let mut sample_rate = params.sample_rate;
    let mut channel_count = params.channels.map(|c| c.count() as u16);
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(AssetError::decode_failure(path, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path, error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(AssetError::decode_failure(path, e)),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channel_count.get_or_insert(spec.channels.count() as u16);

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    let (Some(sample_rate), Some(channel_count)) = (sample_rate, channel_count) else {
        return Err(AssetError::decode_failure(
            path,
            "unable to determine sample rate or channel count",
        ));
    };
    if channel_count == 0 || samples.is_empty() {
        return Err(AssetError::decode_failure(path, "no audio frames decoded"));
    }

    Ok(AudioBuffer::new(samples, channel_count, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetErrorKind;
    use crate::testutil::wav_bytes;

    #[test]
    fn decode_wav() {
        let samples: Vec<f32> = (0..64).map(|i| i as f32 / 128.0).collect();
        let bytes = wav_bytes(&samples, 2, 48000);

        let buffer = decode("stereo.wav", bytes).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 48000);
        assert_eq!(buffer.frame_count(), 32);
        assert_eq!(buffer.samples(), samples.as_slice());
    }

    #[test]
    fn unsupported_format() {
        let error = decode("noise.wav", b"definitely not audio".to_vec()).unwrap_err();
        assert_eq!(error.kind(), AssetErrorKind::UnsupportedFormat);
        assert_eq!(error.path(), "noise.wav");
    }

    #[test]
    fn no_frames() {
        let bytes = wav_bytes(&[], 1, 44100);
        let error = decode("empty.wav", bytes).unwrap_err();
        assert_eq!(error.path(), "empty.wav");
    }
}

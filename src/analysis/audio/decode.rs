use std::io::Cursor;

use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
    io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

use super::{
    AudioFormat, CLIP_SECONDS, SAMPLE_RATE, downmix_to_mono, resample::resample_linear,
};

/// Raw decoded audio in interleaved `f32` samples.
pub(crate) struct DecodedAudio {
    pub(crate) samples: Vec<f32>,
    pub(crate) sample_rate: u32,
    pub(crate) channels: u16,
}

impl DecodedAudio {
    pub(crate) fn into_mono(self) -> (Vec<f32>, u32) {
        (downmix_to_mono(&self.samples, self.channels), self.sample_rate)
    }
}

/// Primary path: decode `[offset, offset + 3 s)` at the native rate, then resample.
pub(crate) fn decode_window(
    bytes: &[u8],
    format: AudioFormat,
    offset_seconds: f32,
) -> Result<Vec<f32>, String> {
    let decoded = decode_with_symphonia(
        bytes,
        Some(format.extension()),
        Some(offset_seconds + CLIP_SECONDS),
    )?;
    let (mono, native_rate) = decoded.into_mono();
    let skip = (offset_seconds * native_rate as f32).round() as usize;
    let take = (CLIP_SECONDS * native_rate as f32).round() as usize;
    let window: Vec<f32> = mono.into_iter().skip(skip).take(take).collect();
    if window.is_empty() {
        return Err(format!(
            "No audio after the {offset_seconds:.2} s offset"
        ));
    }
    Ok(resample_linear(&window, native_rate, SAMPLE_RATE))
}

/// Decode interleaved samples, stopping once `max_seconds` worth of frames is buffered.
pub(crate) fn decode_with_symphonia(
    bytes: &[u8],
    extension_hint: Option<&str>,
    max_seconds: Option<f32>,
) -> Result<DecodedAudio, String> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| format!("Symphonia probe failed: {err}"))?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| "No default track".to_string())?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params
        .channels
        .map(|layout| layout.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|err| format!("Symphonia decoder failed: {err}"))?;

    let mut samples = Vec::new();
    loop {
        if let Some(limit) = max_samples(max_seconds, sample_rate, channels) {
            if samples.len() >= limit {
                samples.truncate(limit);
                break;
            }
        }
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break,
            Err(err) => return Err(format!("Symphonia packet read failed: {err}")),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(Error::DecodeError(_)) => continue,
            Err(err) => return Err(format!("Symphonia decode failed: {err}")),
        };
        let spec = *audio_buf.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend_from_slice(sample_buf.samples());
    }
    if let Some(limit) = max_samples(max_seconds, sample_rate, channels) {
        samples.truncate(limit);
    }

    if samples.is_empty() {
        return Err("Symphonia decoded 0 samples".to_string());
    }
    if sample_rate == 0 || channels == 0 {
        return Err("Missing sample rate or channel count".to_string());
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

fn max_samples(max_seconds: Option<f32>, sample_rate: u32, channels: u16) -> Option<usize> {
    if sample_rate == 0 || channels == 0 {
        return None;
    }
    max_seconds.filter(|limit| *limit > 0.0).map(|limit| {
        let frames = (limit * sample_rate as f32).ceil().max(1.0);
        (frames as usize).saturating_mul(channels as usize).max(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn float_wav(channels: u16, sample_rate: u32, frames: usize, value: f32) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames * channels as usize {
                writer.write_sample::<f32>(value).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decode_stops_at_requested_duration() {
        let bytes = float_wav(2, 44_100, 44_100 * 5, 0.25);
        let decoded = decode_with_symphonia(&bytes, Some("wav"), Some(1.0)).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.sample_rate, 44_100);
        assert_eq!(decoded.samples.len(), 44_100 * 2);
    }

    #[test]
    fn window_is_resampled_to_canonical_rate() {
        let bytes = float_wav(1, 44_100, 44_100 * 2, 0.25);
        let window = decode_window(&bytes, AudioFormat::Wav, 0.0).unwrap();
        assert_eq!(window.len(), SAMPLE_RATE as usize * 2);
        assert!(window.iter().all(|s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn window_skips_offset_and_caps_at_three_seconds() {
        let bytes = float_wav(1, 22_050, 22_050 * 6, 0.1);
        let window = decode_window(&bytes, AudioFormat::Wav, 0.5).unwrap();
        assert_eq!(window.len(), 66_150);
    }

    #[test]
    fn offset_past_the_end_fails() {
        let bytes = float_wav(1, 22_050, 1_000, 0.1);
        assert!(decode_window(&bytes, AudioFormat::Wav, 0.5).is_err());
    }

    #[test]
    fn garbage_fails_to_probe() {
        let err = decode_with_symphonia(b"definitely not audio", Some("wav"), None)
            .err()
            .unwrap();
        assert!(err.contains("probe"));
    }
}

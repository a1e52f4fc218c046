use std::io::Cursor;

use symphonia::core::{
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

use super::{
    ASSUMED_DURATION_SECONDS, AudioFormat, LONG_RECORDING_OFFSET_SECONDS, LONG_RECORDING_SECONDS,
};

/// Read the container duration without decoding, when the container reports one.
pub fn probe_duration_seconds(bytes: &[u8], format: AudioFormat) -> Option<f32> {
    let duration = match format {
        AudioFormat::Wav => probe_wav(bytes).or_else(|| probe_symphonia(bytes, format)),
        AudioFormat::Mp3 => probe_symphonia(bytes, format),
    };
    duration.filter(|secs| secs.is_finite() && *secs >= 0.0)
}

/// Start offset for the analysed window. Long recordings skip their lead-in.
pub fn start_offset_seconds(duration_seconds: Option<f32>) -> f32 {
    let duration = duration_seconds.unwrap_or(ASSUMED_DURATION_SECONDS);
    if duration > LONG_RECORDING_SECONDS {
        LONG_RECORDING_OFFSET_SECONDS
    } else {
        0.0
    }
}

fn probe_wav(bytes: &[u8]) -> Option<f32> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let sample_rate = reader.spec().sample_rate.max(1);
    // `duration` already counts frames per channel.
    Some(reader.duration() as f32 / sample_rate as f32)
}

fn probe_symphonia(bytes: &[u8], format: AudioFormat) -> Option<f32> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(format.extension());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;
    let track = probed.format.default_track()?;
    let params = &track.codec_params;
    let frames = params.n_frames?;
    let sample_rate = params.sample_rate?.max(1);
    Some(frames as f32 / sample_rate as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames * channels as usize {
                writer.write_sample::<i16>(0).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn wav_probe_reads_duration_per_channel() {
        let bytes = wav_bytes(2, 48_000, 96_000);
        let duration = probe_duration_seconds(&bytes, AudioFormat::Wav).unwrap();
        assert!((duration - 2.0).abs() < 1e-3);
    }

    #[test]
    fn garbage_has_no_duration() {
        assert_eq!(probe_duration_seconds(b"not audio", AudioFormat::Wav), None);
        assert_eq!(probe_duration_seconds(b"not audio", AudioFormat::Mp3), None);
    }

    #[test]
    fn offset_applies_only_to_long_recordings() {
        assert_eq!(start_offset_seconds(Some(2.0)), 0.0);
        assert_eq!(start_offset_seconds(Some(4.0)), 0.0);
        assert_eq!(start_offset_seconds(Some(4.01)), 0.5);
        assert_eq!(start_offset_seconds(None), 0.5);
    }
}

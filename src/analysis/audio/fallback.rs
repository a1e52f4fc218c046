use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use super::{
    AudioFormat, CLIP_SECONDS, ExtractionError, SAMPLE_RATE, decode::decode_with_symphonia,
    downmix_to_mono, resample::resample_linear,
};

/// Full decode with a generic reader, then window the canonical-rate signal by hand.
pub(crate) fn decode_full_and_window(
    bytes: &[u8],
    format: AudioFormat,
    offset_seconds: f32,
) -> Result<Vec<f32>, ExtractionError> {
    let (mono, native_rate) = match format {
        AudioFormat::Wav => read_wav(bytes)?,
        AudioFormat::Mp3 => decode_with_symphonia(bytes, None, None)
            .map_err(ExtractionError::Decode)?
            .into_mono(),
    };
    let resampled = resample_linear(&mono, native_rate, SAMPLE_RATE);
    let window = manual_window(resampled, offset_seconds);
    if window.is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(window)
}

/// Take `[offset, offset + 3 s)` when the signal reaches past the offset, else `[0, 3 s)`.
fn manual_window(samples: Vec<f32>, offset_seconds: f32) -> Vec<f32> {
    let offset = (offset_seconds * SAMPLE_RATE as f32).round() as usize;
    let len = (CLIP_SECONDS * SAMPLE_RATE as f32).round() as usize;
    let start = if offset > 0 && samples.len() > offset {
        offset
    } else {
        0
    };
    samples.into_iter().skip(start).take(len).collect()
}

fn read_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32), ExtractionError> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|err| ExtractionError::Decode(format!("WAV read failed: {err}")))?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|err| ExtractionError::Decode(format!("WAV sample read failed: {err}")))?,
        SampleFormat::Int => {
            let scale = (1_i64 << spec.bits_per_sample.saturating_sub(1).min(31)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|err| {
                    ExtractionError::Decode(format!("WAV sample read failed: {err}"))
                })?
        }
    };
    Ok((
        downmix_to_mono(&samples, spec.channels),
        spec.sample_rate.max(1),
    ))
}

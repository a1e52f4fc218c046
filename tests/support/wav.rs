use std::io::Cursor;
use std::path::Path;

pub fn sine(freq: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
    let len = (seconds * sample_rate as f32).round() as usize;
    (0..len)
        .map(|i| 0.4 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// 16-bit mono PCM WAV bytes.
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("create wav writer");
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value).expect("write wav sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

pub fn write_test_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    std::fs::write(path, wav_bytes(samples, sample_rate)).expect("write wav file");
}

/// Silent MPEG-1 Layer III stream: 128 kbps, 44.1 kHz mono frames with zeroed side info.
pub fn silent_mp3(frames: usize) -> Vec<u8> {
    const HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC4];
    const FRAME_LEN: usize = 417;
    let mut bytes = Vec::with_capacity(frames * FRAME_LEN);
    for _ in 0..frames {
        bytes.extend_from_slice(&HEADER);
        bytes.extend(std::iter::repeat_n(0u8, FRAME_LEN - HEADER.len()));
    }
    bytes
}

//! Training over a generated corpus and feature parity with the serving path.

mod support;

use std::path::Path;

use sermo::analysis::{AudioFormat, FEATURE_DIM, extract_from_bytes, extract_from_path};
use sermo::artifacts::ArtifactStore;
use sermo::config::{self, AppSettings, TrainingSettings};
use sermo::training::{TrainingError, train_from_dataset};
use support::env::SermoEnvGuard;
use support::wav::{sine, wav_bytes, write_test_wav};
use tempfile::tempdir;

fn write_corpus(root: &Path) {
    let clips = [
        ("Actor_01/03-01-01-01-01-01-01.wav", 220.0),
        ("Actor_01/03-01-01-01-02-01-01.wav", 247.0),
        ("Actor_01/03-01-05-01-01-01-01.wav", 660.0),
        ("Actor_02/03-01-05-01-02-01-02.wav", 700.0),
        ("Actor_02/03-01-05-02-01-01-02.wav", 740.0),
        ("Actor_02/03-01-01-02-01-01-02.wav", 262.0),
    ];
    for (name, freq) in clips {
        write_test_wav(&root.join(name), &sine(freq, 1.5, 16_000), 16_000);
    }
    write_test_wav(&root.join("Actor_02/unlabeled.wav"), &sine(300.0, 1.0, 16_000), 16_000);
    std::fs::write(root.join("Actor_02/readme.txt"), b"not audio").unwrap();
}

#[test]
fn corpus_trains_and_persists_observed_classes() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    write_corpus(&corpus);
    let store = ArtifactStore::new(dir.path().join("artifacts"));
    let settings = TrainingSettings {
        epochs: 2,
        batch_size: 4,
        filters: 2,
        validation_fraction: 0.34,
        ..TrainingSettings::default()
    };

    let report = train_from_dataset(&corpus, &store, &settings).unwrap();
    assert_eq!(report.samples_used, 6);
    assert_eq!(report.skipped_names, 1);
    assert_eq!(report.failed_extractions, 0);
    assert_eq!(report.classes, vec!["angry".to_string(), "neutral".to_string()]);
    assert_eq!(report.validation_samples, 3);

    let encoding = store.load_label_encoding().unwrap();
    let model = store.load_classifier().unwrap();
    assert_eq!(model.n_classes, encoding.len());
    for (index, class) in encoding.classes().iter().enumerate() {
        assert_eq!(encoding.encode(class), Some(index));
        assert_eq!(encoding.decode(index), Some(class.as_str()));
    }
}

#[test]
fn single_emotion_corpus_writes_nothing() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    write_test_wav(
        &corpus.join("03-01-04-01-01-01-01.wav"),
        &sine(300.0, 1.0, 16_000),
        16_000,
    );
    let store = ArtifactStore::new(dir.path().join("artifacts"));
    let err = train_from_dataset(&corpus, &store, &TrainingSettings::default()).unwrap_err();
    assert!(matches!(err, TrainingError::TooFewClasses { .. }));
    assert!(!store.dir().exists());
}

#[test]
fn training_and_serving_see_identical_features() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("03-01-03-01-01-01-01.wav");
    let samples = sine(523.25, 5.0, 44_100);
    write_test_wav(&path, &samples, 44_100);

    let from_disk = extract_from_path(&path, AudioFormat::Wav).unwrap();
    let upload = std::fs::read(&path).unwrap();
    let from_upload = extract_from_bytes(&upload, AudioFormat::Wav).unwrap();
    assert_eq!(from_disk, from_upload);
    assert_eq!(from_upload.as_slice().len(), FEATURE_DIM);
}

#[test]
fn any_length_yields_the_same_width() {
    for seconds in [0.2, 3.0, 4.0, 7.5] {
        let bytes = wav_bytes(&sine(440.0, seconds, 22_050), 22_050);
        let vector = extract_from_bytes(&bytes, AudioFormat::Wav).unwrap();
        assert_eq!(vector.as_slice().len(), FEATURE_DIM);
        assert!(vector.as_slice().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn config_home_override_controls_artifact_location() {
    let dir = tempdir().unwrap();
    let _guard = SermoEnvGuard::set_config_home(dir.path().to_path_buf());
    let settings = config::load_or_default().unwrap();
    assert_eq!(settings, AppSettings::default());
    let artifacts = settings.resolved_artifacts_dir().unwrap();
    assert!(artifacts.starts_with(dir.path()));
    assert!(artifacts.is_dir());
}

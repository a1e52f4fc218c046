//! Predict the emotion of one or more audio files and print the results as JSON lines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sermo::artifacts::ArtifactStore;
use sermo::config;
use sermo::inference::{ContextHandle, ModelContext, Orchestrator, PredictRequest};
use sermo::logging::LogOptions;

fn main() {
    if let Err(err) = sermo::logging::init(LogOptions::for_binary("sermo-predict")) {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let settings = config::load_or_default()
        .map_err(|err| err.to_string())?
        .normalized();
    let artifacts_dir = match options.artifacts_dir {
        Some(dir) => dir,
        None => settings
            .resolved_artifacts_dir()
            .map_err(|err| err.to_string())?,
    };
    let store = ArtifactStore::new(artifacts_dir);
    let context = Arc::new(ContextHandle::new(ModelContext::load(&store)));
    let orchestrator = Orchestrator::new(context, &settings.inference);

    let mut failures = 0usize;
    for path in &options.files {
        let bytes = std::fs::read(path)
            .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
        let mut request = PredictRequest::from_upload(bytes, file_name(path), &settings.inference);
        request.live_capture |= options.live_capture;
        match orchestrator.predict_with_timeout(request) {
            Ok(result) => {
                let json = serde_json::json!({
                    "file": path.display().to_string(),
                    "emotion": result.emotion,
                    "confidence": result.confidence,
                    "confidence_percent": result.confidence_percent(),
                    "probabilities": result.probabilities,
                });
                println!("{json}");
            }
            Err(err) => {
                failures += 1;
                eprintln!("{}: {}", path.display(), describe(&err));
            }
        }
    }
    if failures > 0 {
        return Err(format!("{failures} of {} predictions failed", options.files.len()));
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    files: Vec<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    live_capture: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--artifacts" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifacts requires a value".to_string())?;
                options.artifacts_dir = Some(PathBuf::from(value));
            }
            "--live-capture" => {
                options.live_capture = true;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            file => options.files.push(PathBuf::from(file)),
        }
        idx += 1;
    }
    if options.files.is_empty() {
        return Err(help_text());
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "sermo-predict",
        "",
        "Predicts the spoken emotion of .wav / .mp3 files.",
        "",
        "Usage:",
        "  sermo-predict [--artifacts <dir>] [--live-capture] <file>...",
        "",
        "Options:",
        "  --artifacts <dir>   Directory with classifier, scaler and label encoding.",
        "  --live-capture      Treat every file as a live demo recording.",
    ]
    .join("\n")
}

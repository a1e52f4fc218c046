use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::context::{ContextHandle, ModelContext};
use super::synthetic::synthetic_prediction;
use crate::analysis::{
    AudioFormat, ExtractionError, FeatureVector, ValidationError, extract_from_bytes,
};
use crate::config::InferenceSettings;
use crate::emotion::Emotion;
use crate::ml::{Classifier, LabelEncoding, StandardScaler, argmax};

/// One uploaded audio resource.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Caller asserts this is a live demo recording; always served synthetically.
    pub live_capture: bool,
}

impl PredictRequest {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            live_capture: false,
        }
    }

    /// Build a request from a raw upload, raising `live_capture` when the name is the
    /// configured live-capture filename.
    pub fn from_upload(
        bytes: Vec<u8>,
        filename: impl Into<String>,
        settings: &InferenceSettings,
    ) -> Self {
        let filename = filename.into();
        let live_capture = filename == settings.live_capture_filename;
        Self {
            bytes,
            filename,
            live_capture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServingPath {
    #[default]
    Model,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub emotion: String,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub probabilities: BTreeMap<String, f32>,
    #[serde(skip)]
    pub path: ServingPath,
}

impl PredictionResult {
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

/// What went wrong after features were extracted.
#[derive(Debug, Error)]
pub enum PredictionFailure {
    #[error("Scaling failed: {0}")]
    Scale(String),
    #[error("Classifier failed: {0}")]
    Infer(String),
    #[error("Classifier returned no probabilities")]
    EmptyOutput,
    #[error("No label for class index {index}")]
    Mapping { index: usize },
    #[error("Extraction worker stopped without a result")]
    Worker,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Feature extraction failed")]
    Extraction(#[from] ExtractionError),
    #[error("Prediction failed")]
    Prediction {
        #[source]
        source: PredictionFailure,
    },
}

impl From<PredictionFailure> for PredictError {
    fn from(source: PredictionFailure) -> Self {
        Self::Prediction { source }
    }
}

/// Serves predictions against whatever context the handle currently holds.
pub struct Orchestrator {
    context: Arc<ContextHandle>,
    rng: Mutex<StdRng>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(context: Arc<ContextHandle>, settings: &InferenceSettings) -> Self {
        let rng = match settings.synthetic_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            context,
            rng: Mutex::new(rng),
            timeout: settings.request_timeout(),
        }
    }

    pub fn with_seed(context: Arc<ContextHandle>, seed: u64) -> Self {
        Self {
            context,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            timeout: InferenceSettings::default().request_timeout(),
        }
    }

    pub fn context(&self) -> &Arc<ContextHandle> {
        &self.context
    }

    /// Validate, extract and classify inline on the calling thread.
    pub fn predict(&self, request: PredictRequest) -> Result<PredictionResult, PredictError> {
        let format = AudioFormat::from_filename(&request.filename)?;
        let features = extract_from_bytes(&request.bytes, format)?;
        drop(request.bytes);
        self.serve(&request.filename, request.live_capture, &features)
    }

    /// Like [`Orchestrator::predict`], with decode and extraction bounded by the configured
    /// timeout on a worker thread.
    pub fn predict_with_timeout(
        &self,
        request: PredictRequest,
    ) -> Result<PredictionResult, PredictError> {
        let PredictRequest {
            bytes,
            filename,
            live_capture,
        } = request;
        let format = AudioFormat::from_filename(&filename)?;
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = extract_from_bytes(&bytes, format);
            let _ = tx.send(result);
        });
        let features = match rx.recv_timeout(self.timeout) {
            Ok(result) => result?,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    filename = %filename,
                    timeout_ms = self.timeout.as_millis(),
                    "Feature extraction timed out"
                );
                return Err(ExtractionError::TimedOut {
                    timeout_ms: self.timeout.as_millis(),
                }
                .into());
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(PredictionFailure::Worker.into());
            }
        };
        self.serve(&filename, live_capture, &features)
    }

    fn serve(
        &self,
        filename: &str,
        live_capture: bool,
        features: &FeatureVector,
    ) -> Result<PredictionResult, PredictError> {
        let context = self.context.snapshot();
        let result = match (&*context, live_capture) {
            (ModelContext::Ready { .. }, true) | (ModelContext::Degraded { .. }, _) => {
                self.synthetic()
            }
            (
                ModelContext::Ready {
                    classifier,
                    scaler,
                    encoding,
                },
                false,
            ) => model_prediction(
                &**classifier,
                scaler,
                encoding.as_ref(),
                features.as_slice(),
            )?,
        };
        info!(
            filename,
            path = ?result.path,
            emotion = %result.emotion,
            confidence = result.confidence,
            "Prediction served"
        );
        Ok(result)
    }

    fn synthetic(&self) -> PredictionResult {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        synthetic_prediction(&mut *rng)
    }
}

fn model_prediction(
    classifier: &dyn Classifier,
    scaler: &StandardScaler,
    encoding: Option<&LabelEncoding>,
    features: &[f32],
) -> Result<PredictionResult, PredictionFailure> {
    let scaled = scaler.transform(features).map_err(PredictionFailure::Scale)?;
    let probabilities = classifier.infer(&scaled).map_err(PredictionFailure::Infer)?;
    let index = argmax(&probabilities).ok_or(PredictionFailure::EmptyOutput)?;
    let confidence = probabilities[index];
    let (emotion, map) = match encoding {
        Some(encoding) => {
            let emotion = encoding
                .decode(index)
                .ok_or(PredictionFailure::Mapping { index })?
                .to_string();
            let map = encoding
                .classes()
                .iter()
                .enumerate()
                .map(|(i, class)| (class.clone(), probabilities.get(i).copied().unwrap_or(0.0)))
                .collect();
            (emotion, map)
        }
        None => {
            debug!("No label encoding loaded; mapping outputs onto the default taxonomy");
            let emotion = Emotion::ALL
                .get(index)
                .ok_or(PredictionFailure::Mapping { index })?
                .as_str()
                .to_string();
            let map = Emotion::ALL
                .iter()
                .enumerate()
                .map(|(i, emotion)| {
                    (
                        emotion.as_str().to_string(),
                        probabilities.get(i).copied().unwrap_or(0.0),
                    )
                })
                .collect();
            (emotion, map)
        }
    };
    Ok(PredictionResult {
        emotion,
        confidence,
        probabilities: map,
        path: ServingPath::Model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FEATURE_DIM;
    use crate::artifacts::ArtifactKind;
    use crate::artifacts::test_support::trio;

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn class_count(&self) -> usize {
            self.0.len()
        }

        fn infer(&self, _features: &[f32]) -> Result<Vec<f32>, String> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn class_count(&self) -> usize {
            2
        }

        fn infer(&self, _features: &[f32]) -> Result<Vec<f32>, String> {
            Err("weights exploded".into())
        }
    }

    fn scaler() -> StandardScaler {
        trio(&["a", "b"]).1
    }

    fn features() -> Vec<f32> {
        vec![0.25; FEATURE_DIM]
    }

    #[test]
    fn encoding_drives_labels_and_keys() {
        let encoding = LabelEncoding::fit(["angry", "happy", "sad"]).unwrap();
        let result = model_prediction(
            &Fixed(vec![0.1, 0.7, 0.2]),
            &scaler(),
            Some(&encoding),
            &features(),
        )
        .unwrap();
        assert_eq!(result.emotion, "happy");
        assert_eq!(result.confidence, 0.7);
        let keys: Vec<&str> = result.probabilities.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["angry", "happy", "sad"]);
        assert_eq!(result.path, ServingPath::Model);
    }

    #[test]
    fn short_output_without_encoding_is_zero_padded() {
        let result =
            model_prediction(&Fixed(vec![0.2, 0.5, 0.3]), &scaler(), None, &features()).unwrap();
        assert_eq!(result.emotion, "calm");
        assert_eq!(result.probabilities.len(), 8);
        assert_eq!(result.probabilities["surprised"], 0.0);
        assert_eq!(result.probabilities["neutral"], 0.2);
    }

    #[test]
    fn classifier_errors_carry_their_cause() {
        let context = ModelContext::ready(Arc::new(Broken), scaler(), None);
        let orchestrator = Orchestrator::with_seed(Arc::new(ContextHandle::new(context)), 1);
        let err = orchestrator
            .serve("clip.wav", false, &FeatureVector::from_values(features()).unwrap())
            .unwrap_err();
        match err {
            PredictError::Prediction {
                source: PredictionFailure::Infer(reason),
            } => assert_eq!(reason, "weights exploded"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn live_capture_flag_forces_synthetic_path() {
        let (model, scaler, encoding) = trio(&["angry", "calm"]);
        let context = ModelContext::ready(Arc::new(model), scaler, Some(encoding));
        let orchestrator = Orchestrator::with_seed(Arc::new(ContextHandle::new(context)), 9);
        let vector = FeatureVector::from_values(features()).unwrap();
        let result = orchestrator.serve("live.wav", true, &vector).unwrap();
        assert_eq!(result.path, ServingPath::Synthetic);
        let served = orchestrator.serve("clip.wav", false, &vector).unwrap();
        assert_eq!(served.path, ServingPath::Model);
    }

    #[test]
    fn degraded_context_serves_synthetic() {
        let context = ModelContext::degraded([ArtifactKind::Classifier]);
        let orchestrator = Orchestrator::with_seed(Arc::new(ContextHandle::new(context)), 4);
        let vector = FeatureVector::from_values(features()).unwrap();
        let result = orchestrator.serve("clip.mp3", false, &vector).unwrap();
        assert_eq!(result.path, ServingPath::Synthetic);
    }

    #[test]
    fn upload_sentinel_maps_to_flag() {
        let settings = InferenceSettings::default();
        let live = PredictRequest::from_upload(
            Vec::new(),
            settings.live_capture_filename.clone(),
            &settings,
        );
        assert!(live.live_capture);
        let plain = PredictRequest::from_upload(Vec::new(), "take_2.wav", &settings);
        assert!(!plain.live_capture);
    }

    #[test]
    fn disallowed_extension_is_rejected_before_decode() {
        let orchestrator = Orchestrator::with_seed(
            Arc::new(ContextHandle::new(ModelContext::degraded(ArtifactKind::ALL))),
            0,
        );
        let err = orchestrator
            .predict(PredictRequest::new(b"not audio".to_vec(), "notes.txt"))
            .unwrap_err();
        assert!(matches!(err, PredictError::Validation(_)));
    }

    #[test]
    fn percent_formatting() {
        let result = PredictionResult {
            emotion: "sad".into(),
            confidence: 0.8732,
            probabilities: BTreeMap::new(),
            path: ServingPath::Model,
        };
        assert_eq!(result.confidence_percent(), "87.32%");
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("path").is_none());
        assert!(json.get("confidence").is_some());
    }
}

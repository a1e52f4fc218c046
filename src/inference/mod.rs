//! Request-time serving: model context, the synthetic fallback and the orchestrator.

pub mod context;
pub mod orchestrator;
pub mod synthetic;

pub use context::{ContextHandle, ModelContext};
pub use orchestrator::{
    Orchestrator, PredictError, PredictRequest, PredictionFailure, PredictionResult, ServingPath,
};
pub use synthetic::synthetic_prediction;

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::artifacts::{ArtifactError, ArtifactKind, ArtifactStore};
use crate::ml::{Classifier, LabelEncoding, StandardScaler};

/// Immutable serving state shared by every request.
pub enum ModelContext {
    Ready {
        classifier: Arc<dyn Classifier>,
        scaler: StandardScaler,
        /// Authoritative index-to-name mapping when present.
        encoding: Option<LabelEncoding>,
    },
    Degraded {
        missing: BTreeSet<ArtifactKind>,
    },
}

impl std::fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready {
                classifier,
                encoding,
                ..
            } => f
                .debug_struct("Ready")
                .field("class_count", &classifier.class_count())
                .field("encoding", encoding)
                .finish(),
            Self::Degraded { missing } => {
                f.debug_struct("Degraded").field("missing", missing).finish()
            }
        }
    }
}

impl ModelContext {
    /// Load each artifact independently; failures only log and mark that artifact missing.
    pub fn load(store: &ArtifactStore) -> Self {
        let classifier = loaded(ArtifactKind::Classifier, store.load_classifier());
        let scaler = loaded(ArtifactKind::Scaler, store.load_scaler());
        let encoding = loaded(ArtifactKind::LabelEncoding, store.load_label_encoding());
        let context = match (classifier, scaler) {
            (Some(classifier), Some(scaler)) => {
                Self::ready(Arc::new(classifier), scaler, encoding)
            }
            (classifier, scaler) => {
                let mut missing = BTreeSet::new();
                if classifier.is_none() {
                    missing.insert(ArtifactKind::Classifier);
                }
                if scaler.is_none() {
                    missing.insert(ArtifactKind::Scaler);
                }
                if encoding.is_none() {
                    missing.insert(ArtifactKind::LabelEncoding);
                }
                Self::Degraded { missing }
            }
        };
        match &context {
            Self::Ready { encoding, .. } => info!(
                dir = %store.dir().display(),
                label_encoding = encoding.is_some(),
                "Model context ready"
            ),
            Self::Degraded { missing } => warn!(
                dir = %store.dir().display(),
                ?missing,
                "Model context degraded; serving synthetic predictions"
            ),
        }
        context
    }

    /// Build a ready context, dropping an encoding whose width disagrees with the classifier.
    pub fn ready(
        classifier: Arc<dyn Classifier>,
        scaler: StandardScaler,
        encoding: Option<LabelEncoding>,
    ) -> Self {
        let encoding = encoding.filter(|encoding| {
            let matches = encoding.len() == classifier.class_count();
            if !matches {
                warn!(
                    classes = encoding.len(),
                    outputs = classifier.class_count(),
                    "Label encoding does not match classifier outputs; using the default taxonomy"
                );
            }
            matches
        });
        Self::Ready {
            classifier,
            scaler,
            encoding,
        }
    }

    pub fn degraded(missing: impl IntoIterator<Item = ArtifactKind>) -> Self {
        Self::Degraded {
            missing: missing.into_iter().collect(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

fn loaded<T>(kind: ArtifactKind, result: Result<T, ArtifactError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) if err.is_missing() => {
            warn!(artifact = %kind, error = %err, "Artifact not available");
            None
        }
        Err(err) => {
            warn!(artifact = %kind, error = %err, "Artifact failed to load");
            None
        }
    }
}

/// Swappable holder; requests take a snapshot and never observe a partial update.
#[derive(Debug)]
pub struct ContextHandle {
    current: RwLock<Arc<ModelContext>>,
}

impl ContextHandle {
    pub fn new(context: ModelContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(context)),
        }
    }

    pub fn snapshot(&self) -> Arc<ModelContext> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the whole context, returning the previous one.
    pub fn swap(&self, context: ModelContext) -> Arc<ModelContext> {
        let next = Arc::new(context);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }

    /// Load a fresh context from `store` and swap it in.
    pub fn reload(&self, store: &ArtifactStore) -> Arc<ModelContext> {
        let context = ModelContext::load(store);
        self.swap(context);
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::test_support::trio;
    use tempfile::tempdir;

    #[test]
    fn empty_store_is_degraded_with_everything_missing() {
        let dir = tempdir().unwrap();
        let context = ModelContext::load(&ArtifactStore::new(dir.path()));
        match context {
            ModelContext::Degraded { missing } => {
                assert_eq!(missing, BTreeSet::from(ArtifactKind::ALL));
            }
            other => panic!("expected degraded context, got {other:?}"),
        }
    }

    #[test]
    fn missing_encoding_still_serves_the_model() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let (model, scaler, encoding) = trio(&["angry", "calm"]);
        store.save_all(&model, &scaler, &encoding).unwrap();
        std::fs::remove_file(store.path(ArtifactKind::LabelEncoding)).unwrap();
        let context = ModelContext::load(&store);
        assert!(matches!(
            context,
            ModelContext::Ready { encoding: None, .. }
        ));
    }

    #[test]
    fn corrupt_scaler_degrades_only_that_artifact() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let (model, scaler, encoding) = trio(&["angry", "calm"]);
        store.save_all(&model, &scaler, &encoding).unwrap();
        std::fs::write(store.path(ArtifactKind::Scaler), b"garbage").unwrap();
        match ModelContext::load(&store) {
            ModelContext::Degraded { missing } => {
                assert_eq!(missing, BTreeSet::from([ArtifactKind::Scaler]));
            }
            other => panic!("expected degraded context, got {other:?}"),
        }
    }

    #[test]
    fn swap_replaces_whole_context() {
        let handle = ContextHandle::new(ModelContext::degraded([ArtifactKind::Classifier]));
        let before = handle.snapshot();
        let (model, scaler, encoding) = trio(&["happy", "sad"]);
        let previous = handle.swap(ModelContext::ready(Arc::new(model), scaler, Some(encoding)));
        assert!(previous.is_degraded());
        assert!(before.is_degraded());
        assert!(!handle.snapshot().is_degraded());
    }

    #[test]
    fn mismatched_encoding_is_dropped() {
        let (model, scaler, _) = trio(&["happy", "sad"]);
        let wider = LabelEncoding::fit(["angry", "happy", "sad"]).unwrap();
        let context = ModelContext::ready(Arc::new(model), scaler, Some(wider));
        assert!(matches!(
            context,
            ModelContext::Ready { encoding: None, .. }
        ));
    }
}

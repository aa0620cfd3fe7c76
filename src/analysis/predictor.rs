//! Batch prediction over a lazily loaded, shared model handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::error::AnalysisError;
use super::model::{JsonModelLoader, ModelLoader, ScoringModel};

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("model unavailable at {path}: {reason}")]
    ModelUnavailable { path: String, reason: String },
    #[error("invalid prediction input: {0}")]
    InputShape(String),
}

impl From<PredictorError> for AnalysisError {
    fn from(error: PredictorError) -> Self {
        match error {
            PredictorError::ModelUnavailable { path, .. } => Self::ModelUnavailable { path },
            PredictorError::InputShape(detail) => Self::InputShape { detail },
        }
    }
}

type LoadedModel = (PathBuf, Arc<dyn ScoringModel>);

/// Turns comment batches into prediction scores.
///
/// The model is loaded on first use and then reused by every caller. A
/// failed load leaves the handle empty so the next call retries.
pub struct BatchPredictor {
    loader: Arc<dyn ModelLoader>,
    slot: Mutex<Option<LoadedModel>>,
}

impl Default for BatchPredictor {
    fn default() -> Self {
        Self::new(Arc::new(JsonModelLoader))
    }
}

impl BatchPredictor {
    #[must_use]
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
        }
    }

    /// Score `comments` with the model at `model_path`.
    ///
    /// One score per comment in input order. Scores are returned as produced
    /// by the model; range checks happen downstream.
    ///
    /// # Errors
    /// [`PredictorError::InputShape`] for an empty batch or a batch the model
    /// rejects, [`PredictorError::ModelUnavailable`] when the model cannot be
    /// loaded.
    pub fn predict(
        &self,
        comments: &[String],
        model_path: &Path,
    ) -> Result<Vec<f64>, PredictorError> {
        if comments.is_empty() {
            return Err(PredictorError::InputShape(
                "comment batch is empty".to_string(),
            ));
        }

        let model = self.model(model_path)?;
        let scores = model
            .score_batch(comments)
            .map_err(|error| PredictorError::InputShape(format!("{error:#}")))?;

        debug!(batch = comments.len(), scores = scores.len(), "scored comment batch");
        Ok(scores)
    }

    /// Drop the cached model so the next prediction reloads it.
    pub fn reset(&self) {
        self.slot.lock().take();
    }

    /// Whether a model is currently cached.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.slot.lock().is_some()
    }

    fn model(&self, model_path: &Path) -> Result<Arc<dyn ScoringModel>, PredictorError> {
        let mut slot = self.slot.lock();
        if let Some((path, model)) = slot.as_ref() {
            if path == model_path {
                return Ok(Arc::clone(model));
            }
        }

        match self.loader.load(model_path) {
            Ok(model) => {
                info!(path = %model_path.display(), "classifier model loaded");
                *slot = Some((model_path.to_path_buf(), Arc::clone(&model)));
                Ok(model)
            }
            Err(error) => {
                warn!(path = %model_path.display(), error = %error, "classifier model could not be loaded");
                Err(PredictorError::ModelUnavailable {
                    path: model_path.display().to_string(),
                    reason: format!("{error:#}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FixedModel(f64);

    impl ScoringModel for FixedModel {
        fn score_batch(&self, comments: &[String]) -> anyhow::Result<Vec<f64>> {
            Ok(comments
                .iter()
                .enumerate()
                .map(|(idx, _)| self.0 + idx as f64 * 0.01)
                .collect())
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
        fail: bool,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, _path: &Path) -> anyhow::Result<Arc<dyn ScoringModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("no such file");
            }
            Ok(Arc::new(FixedModel(0.2)))
        }
    }

    fn comments(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("comment {i}")).collect()
    }

    #[test]
    fn empty_batch_is_rejected_without_loading() {
        let loader = Arc::new(CountingLoader::default());
        let predictor = BatchPredictor::new(loader.clone());

        let err = predictor.predict(&[], Path::new("model.json")).unwrap_err();
        assert!(matches!(err, PredictorError::InputShape(_)));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn returns_one_score_per_comment_in_order() {
        let predictor = BatchPredictor::new(Arc::new(CountingLoader::default()));
        let scores = predictor
            .predict(&comments(3), Path::new("model.json"))
            .unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores[0] < scores[1] && scores[1] < scores[2]);
    }

    #[test]
    fn model_is_loaded_once_and_reset_rearms() {
        let loader = Arc::new(CountingLoader::default());
        let predictor = BatchPredictor::new(loader.clone());
        let path = Path::new("model.json");

        predictor.predict(&comments(1), path).unwrap();
        predictor.predict(&comments(2), path).unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(predictor.is_loaded());

        predictor.reset();
        assert!(!predictor.is_loaded());
        predictor.predict(&comments(1), path).unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let loader = Arc::new(CountingLoader {
            fail: true,
            ..CountingLoader::default()
        });
        let predictor = BatchPredictor::new(loader.clone());
        let path = Path::new("missing.json");

        for _ in 0..2 {
            let err = predictor.predict(&comments(1), path).unwrap_err();
            assert!(matches!(err, PredictorError::ModelUnavailable { .. }));
        }
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert!(!predictor.is_loaded());
    }
}

//! Bag-of-words logistic scorer used as the misinformation classifier.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Black-box scorer: one score in `[0, 1]` per input string.
pub trait ScoringModel: Send + Sync {
    /// Score every comment, preserving order.
    ///
    /// # Errors
    /// Implementations fail when the batch cannot be scored as a whole.
    fn score_batch(&self, comments: &[String]) -> Result<Vec<f64>>;
}

/// Resolves a model from a path.
pub trait ModelLoader: Send + Sync {
    /// # Errors
    /// Fails when nothing usable exists at `path`.
    fn load(&self, path: &Path) -> Result<Arc<dyn ScoringModel>>;
}

#[derive(Debug, Deserialize)]
struct ModelWeights {
    bias: f64,
    weights: HashMap<String, f64>,
}

impl ModelWeights {
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.bias.is_finite(), "bias must be finite");
        anyhow::ensure!(!self.weights.is_empty(), "weight table is empty");
        if let Some((token, _)) = self.weights.iter().find(|(_, w)| !w.is_finite()) {
            anyhow::bail!("weight for token {token:?} is not finite");
        }
        Ok(())
    }
}

/// Logistic regression over lower-cased word tokens.
///
/// The weights file is JSON: `{"bias": -0.3, "weights": {"hoax": 1.7, ...}}`.
#[derive(Debug)]
pub struct LogisticTextModel {
    bias: f64,
    weights: HashMap<String, f64>,
}

impl LogisticTextModel {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read classifier weights from {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let weights: ModelWeights =
            serde_json::from_str(raw).context("failed to parse classifier weights json")?;
        weights.validate()?;
        Ok(Self {
            bias: weights.bias,
            weights: weights.weights,
        })
    }

    fn score(&self, comment: &str) -> f64 {
        let logit = tokenize(comment)
            .filter_map(|token| self.weights.get(&token))
            .fold(self.bias, |acc, weight| acc + weight);
        sigmoid(logit)
    }
}

impl ScoringModel for LogisticTextModel {
    fn score_batch(&self, comments: &[String]) -> Result<Vec<f64>> {
        Ok(comments.iter().map(|comment| self.score(comment)).collect())
    }
}

/// Loads [`LogisticTextModel`] weight files from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonModelLoader;

impl ModelLoader for JsonModelLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ScoringModel>> {
        let model = LogisticTextModel::from_path(path)?;
        Ok(Arc::new(model))
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const WEIGHTS: &str = r#"{"bias": 0.0, "weights": {"hoax": 2.0, "microchip": 1.5, "thanks": -2.0}}"#;

    #[test]
    fn scores_stay_in_unit_interval_and_follow_weights() {
        let model = LogisticTextModel::from_json(WEIGHTS).unwrap();
        let scores = model
            .score_batch(&[
                "The vaccine has a MICROCHIP, total hoax!".to_string(),
                "thanks for the video".to_string(),
                "nothing known here".to_string(),
            ])
            .unwrap();

        assert_eq!(scores.len(), 3);
        assert!(scores[0] > 0.95);
        assert!(scores[1] < 0.2);
        assert!((scores[2] - 0.5).abs() < f64::EPSILON);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn tokenizer_lowercases_and_splits_on_punctuation() {
        let tokens: Vec<_> = tokenize("Hoax!!  it's 5G").collect();
        assert_eq!(tokens, vec!["hoax", "it", "s", "5g"]);
    }

    #[test]
    fn rejects_malformed_weight_files() {
        assert!(LogisticTextModel::from_json("{").is_err());
        assert!(LogisticTextModel::from_json(r#"{"bias": 0.1, "weights": {}}"#).is_err());
    }

    #[test]
    fn loader_reads_weights_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(WEIGHTS.as_bytes()).unwrap();

        let model = JsonModelLoader.load(file.path()).unwrap();
        let scores = model.score_batch(&["hoax".to_string()]).unwrap();
        assert!(scores[0] > 0.5);
    }

    #[test]
    fn loader_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = JsonModelLoader.load(&dir.path().join("missing.json"));
        assert!(result.is_err());
    }
}

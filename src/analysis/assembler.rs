//! Combines prediction scores with their comments into positional records.

use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map::Entry;

use serde::Serialize;

use crate::util::rounding::round_to;

use super::confidence::calculate_confidence;
use super::error::AnalysisError;
use super::labeler::{self, Classification, ClassificationLabel, ClassificationRegistry};

/// One analysed comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysedRecord {
    pub position: usize,
    pub comment: String,
    pub classification: String,
    pub classification_id: i64,
    pub prediction_value: f64,
    pub prediction_confidence: i64,
}

/// Records keyed by their 1-based position in the input batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysedComments(BTreeMap<usize, AnalysedRecord>);

impl AnalysedComments {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&AnalysedRecord> {
        self.0.get(&position)
    }

    /// Records in position order.
    pub fn records(&self) -> impl Iterator<Item = &AnalysedRecord> {
        self.0.values()
    }

    /// Number of records labelled with `name`.
    #[must_use]
    pub fn count_labelled(&self, name: &str) -> usize {
        self.0
            .values()
            .filter(|record| record.classification == name)
            .count()
    }
}

/// Build one record per comment.
///
/// Each score is rounded to three decimals, then its confidence is computed
/// before it is labelled, so a bad score reports the confidence error.
/// Registry lookups are memoised per label for the duration of the call.
///
/// # Errors
/// [`AnalysisError::LengthMismatch`] when the two slices differ in length;
/// otherwise any error from labelling or the confidence calculation.
pub async fn assemble(
    predictions: &[f64],
    comments: &[String],
    threshold: f64,
    registry: &dyn ClassificationRegistry,
) -> Result<AnalysedComments, AnalysisError> {
    if predictions.len() != comments.len() {
        return Err(AnalysisError::LengthMismatch {
            predictions: predictions.len(),
            comments: comments.len(),
        });
    }

    let mut resolved: HashMap<ClassificationLabel, Classification> = HashMap::new();
    let mut records = BTreeMap::new();

    for (index, (prediction, comment)) in predictions.iter().zip(comments).enumerate() {
        let prediction_value = round_to(*prediction, 3);
        let prediction_confidence = calculate_confidence(prediction_value, threshold)?;
        let label = ClassificationLabel::for_score(prediction_value, threshold)?;
        let classification = match resolved.entry(label) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => entry.insert(labeler::lookup(label, registry).await?).clone(),
        };

        let position = index + 1;
        records.insert(
            position,
            AnalysedRecord {
                position,
                comment: comment.clone(),
                classification: classification.name,
                classification_id: classification.id,
                prediction_value,
                prediction_confidence,
            },
        );
    }

    Ok(AnalysedComments(records))
}

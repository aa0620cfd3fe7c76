//! Binary labelling of prediction scores against the classification registry.

use async_trait::async_trait;
use serde::Serialize;

use super::error::{AnalysisError, RangeCheck};

/// A registered classification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub id: i64,
    pub name: String,
}

/// The two labels a score can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationLabel {
    Misinformation,
    Neutral,
}

impl ClassificationLabel {
    /// Registry name of the label.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Misinformation => "Misinformation",
            Self::Neutral => "Neutral",
        }
    }

    /// Label for a score. Scores at or above `threshold` are misinformation.
    ///
    /// # Errors
    /// [`AnalysisError::RangeViolation`] when `prediction_value` is outside `[0, 1]`.
    pub fn for_score(prediction_value: f64, threshold: f64) -> Result<Self, AnalysisError> {
        if !(0.0..=1.0).contains(&prediction_value) {
            return Err(AnalysisError::RangeViolation {
                value: prediction_value,
                check: RangeCheck::Classification,
            });
        }
        if prediction_value >= threshold {
            Ok(Self::Misinformation)
        } else {
            Ok(Self::Neutral)
        }
    }
}

/// Read access to the registered classifications.
#[async_trait]
pub trait ClassificationRegistry: Send + Sync {
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Classification>>;

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Classification>>;
}

/// Resolve the registered classification for a score.
///
/// The range check runs before any registry lookup.
///
/// # Errors
/// [`AnalysisError::RangeViolation`] for scores outside `[0, 1]`,
/// [`AnalysisError::ClassificationNotFound`] when the label is not registered,
/// [`AnalysisError::Unexpected`] when the registry itself fails.
pub async fn classify(
    prediction_value: f64,
    threshold: f64,
    registry: &dyn ClassificationRegistry,
) -> Result<Classification, AnalysisError> {
    let label = ClassificationLabel::for_score(prediction_value, threshold)?;
    lookup(label, registry).await
}

pub(crate) async fn lookup(
    label: ClassificationLabel,
    registry: &dyn ClassificationRegistry,
) -> Result<Classification, AnalysisError> {
    registry
        .find_by_name(label.name())
        .await
        .map_err(AnalysisError::Unexpected)?
        .ok_or_else(|| AnalysisError::ClassificationNotFound {
            name: label.name().to_string(),
        })
}

//! `analyse_comments`: source, then prediction, then assembly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::observability::metrics::Metrics;

use super::assembler::{AnalysedComments, assemble};
use super::error::AnalysisError;
use super::labeler::{ClassificationLabel, ClassificationRegistry};
use super::predictor::BatchPredictor;
use super::source::{CommentFetcher, CommentSource, collect_comments};

/// Successful result of one analysis request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub source: &'static str,
    pub comment_count: usize,
    pub records: AnalysedComments,
}

/// Runs the comment analysis pipeline.
///
/// Holds no per-request state; every call is independent.
pub struct CommentAnalyser {
    fetcher: Arc<dyn CommentFetcher>,
    predictor: Arc<BatchPredictor>,
    registry: Arc<dyn ClassificationRegistry>,
    model_path: PathBuf,
    threshold: f64,
    metrics: Arc<Metrics>,
}

impl CommentAnalyser {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn CommentFetcher>,
        predictor: Arc<BatchPredictor>,
        registry: Arc<dyn ClassificationRegistry>,
        model_path: PathBuf,
        threshold: f64,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            fetcher,
            predictor,
            registry,
            model_path,
            threshold,
            metrics,
        }
    }

    #[must_use]
    pub fn predictor(&self) -> &Arc<BatchPredictor> {
        &self.predictor
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Analyse the comments named by `selector` and `input`.
    ///
    /// Either every comment is analysed or the whole request fails with a
    /// single [`AnalysisError`].
    ///
    /// # Errors
    /// See [`AnalysisError`] for the full taxonomy.
    #[instrument(skip(self, input), fields(source = %selector))]
    pub async fn analyse_comments(
        &self,
        selector: &str,
        input: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.metrics.analyses_total.inc();

        let result = self.run(selector, input).await;
        match &result {
            Ok(report) => {
                info!(
                    comment_count = report.comment_count,
                    flagged = report.records.count_labelled(ClassificationLabel::Misinformation.name()),
                    "comments analysed"
                );
            }
            Err(error) => {
                self.metrics.record_failure(error.kind());
                if error.is_client_error() {
                    warn!(kind = error.kind(), error = %error, "comment analysis rejected");
                } else {
                    error!(kind = error.kind(), error = %error, "comment analysis failed");
                }
            }
        }
        result
    }

    async fn run(&self, selector: &str, input: &str) -> Result<AnalysisReport, AnalysisError> {
        let source: CommentSource = selector.parse()?;

        let fetch_started = Instant::now();
        let comments = collect_comments(source, input, self.fetcher.as_ref()).await?;
        self.metrics
            .fetch_duration
            .observe(fetch_started.elapsed().as_secs_f64());

        let comments = Arc::new(comments);
        let predict_started = Instant::now();
        let predictions = {
            let predictor = Arc::clone(&self.predictor);
            let batch = Arc::clone(&comments);
            let model_path = self.model_path.clone();
            tokio::task::spawn_blocking(move || predictor.predict(&batch, &model_path))
                .await
                .map_err(|error| AnalysisError::Unexpected(error.into()))??
        };
        self.metrics
            .prediction_duration
            .observe(predict_started.elapsed().as_secs_f64());

        let records = assemble(
            &predictions,
            &comments,
            self.threshold,
            self.registry.as_ref(),
        )
        .await?;

        let flagged = records.count_labelled(ClassificationLabel::Misinformation.name());
        self.metrics.comments_classified.inc_by(records.len() as u64);
        self.metrics.comments_flagged.inc_by(flagged as u64);

        Ok(AnalysisReport {
            source: source.as_str(),
            comment_count: records.len(),
            records,
        })
    }
}

pub mod assembler;
pub mod confidence;
pub mod error;
pub mod labeler;
pub mod model;
pub mod orchestrator;
pub mod predictor;
pub mod source;

pub use assembler::{AnalysedComments, AnalysedRecord};
pub use error::AnalysisError;
pub use labeler::{Classification, ClassificationRegistry};
pub use orchestrator::{AnalysisReport, CommentAnalyser};
pub use predictor::BatchPredictor;
pub use source::{CommentFetcher, CommentSource, FetchError};

use std::fmt;

use thiserror::Error;

/// Which component rejected an out-of-range prediction value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCheck {
    Confidence,
    Classification,
}

impl fmt::Display for RangeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confidence => {
                f.write_str("The prediction value of a comment is not within the (0-1) range.")
            }
            Self::Classification => {
                f.write_str("A prediction value outside the range (0-1) cannot be classified!")
            }
        }
    }
}

/// Failure of a comment analysis request.
///
/// Every collaborator failure is mapped to exactly one variant. The
/// `Display` text is the message shown to the user.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Comments could not be returned from an unknown source!")]
    InvalidSource { selector: String },

    #[error("No comments were found for the YouTube video with videoId: {video_id}")]
    NoCommentsFound { video_id: String },

    #[error("An error occured while retrieving YouTube comments: {status} {reason}")]
    UpstreamService { status: u16, reason: String },

    #[error("The file for the Neural Network Model could not be found!")]
    ModelUnavailable { path: String },

    #[error("There is an error with the input comment data during predictions!")]
    InputShape { detail: String },

    #[error("{check}")]
    RangeViolation { value: f64, check: RangeCheck },

    #[error("A zero-division error has occurred as the prediction threshold has been set to 0!")]
    DivideByZero,

    #[error("The number of prediction values does not match the number of comments!")]
    LengthMismatch { predictions: usize, comments: usize },

    #[error("Classification '{name}' is not registered.")]
    ClassificationNotFound { name: String },

    #[error("Something unexpected occurred while analysing comment data!")]
    Unexpected(#[source] anyhow::Error),
}

impl AnalysisError {
    /// Stable tag for logs, metrics labels and response bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSource { .. } => "InvalidSource",
            Self::NoCommentsFound { .. } => "NoCommentsFound",
            Self::UpstreamService { .. } => "UpstreamServiceError",
            Self::ModelUnavailable { .. } => "ModelUnavailable",
            Self::InputShape { .. } => "InputShapeError",
            Self::RangeViolation { .. } => "RangeViolation",
            Self::DivideByZero => "DivideByZero",
            Self::LengthMismatch { .. } => "LengthMismatch",
            Self::ClassificationNotFound { .. } => "ClassificationNotFound",
            Self::Unexpected(_) => "UnexpectedError",
        }
    }

    /// Failures caused by the request itself rather than the service.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSource { .. } | Self::NoCommentsFound { .. } | Self::RangeViolation { .. }
        )
    }
}

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::analysis::AnalysisError;

/// Field name to messages, in the order they were found.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub(crate) struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    pub(crate) fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("request validation failed")]
    Validation(FieldErrors),
    #[error("authentication failed")]
    Unauthorized(FieldErrors),
    #[error("conflict")]
    Conflict(FieldErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("forbidden")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct AnalysisErrorBody<'a> {
    error_type: &'a str,
    error_message: String,
}

#[derive(Debug, Serialize)]
struct FieldErrorBody {
    errors: FieldErrors,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub(crate) fn analysis_status(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::UpstreamService { .. } => StatusCode::BAD_GATEWAY,
        AnalysisError::NoCommentsFound { .. } => StatusCode::NOT_FOUND,
        AnalysisError::InvalidSource { .. }
        | AnalysisError::RangeViolation { .. }
        | AnalysisError::DivideByZero => StatusCode::BAD_REQUEST,
        AnalysisError::ModelUnavailable { .. }
        | AnalysisError::InputShape { .. }
        | AnalysisError::LengthMismatch { .. }
        | AnalysisError::ClassificationNotFound { .. }
        | AnalysisError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Analysis(error) => {
                let status = analysis_status(&error);
                let body = AnalysisErrorBody {
                    error_type: error.kind(),
                    error_message: error.to_string(),
                };
                (status, Json(body)).into_response()
            }
            Self::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(FieldErrorBody { errors })).into_response()
            }
            Self::Unauthorized(errors) => {
                (StatusCode::UNAUTHORIZED, Json(FieldErrorBody { errors })).into_response()
            }
            Self::Conflict(errors) => {
                (StatusCode::CONFLICT, Json(FieldErrorBody { errors })).into_response()
            }
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message })).into_response()
            }
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse {
                    error: "You are not the author of this issue.".to_string(),
                }),
            )
                .into_response(),
            Self::Internal(error) => {
                error!(error = ?error, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_errors_map_to_documented_statuses() {
        let cases = [
            (
                AnalysisError::UpstreamService {
                    status: 403,
                    reason: "forbidden".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AnalysisError::NoCommentsFound {
                    video_id: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                AnalysisError::InvalidSource {
                    selector: "rss".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (AnalysisError::DivideByZero, StatusCode::BAD_REQUEST),
            (
                AnalysisError::ModelUnavailable {
                    path: "model".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AnalysisError::LengthMismatch {
                    predictions: 1,
                    comments: 2,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(analysis_status(&error), status, "{error:?}");
        }
    }

    #[test]
    fn field_errors_collect_in_order() {
        let mut errors = FieldErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.push("email", "first");
        errors.push("email", "second");
        errors.push("password", "third");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["email"], serde_json::json!(["first", "second"]));
        assert_eq!(json["password"][0], "third");
        assert!(matches!(errors.into_result(), Err(ApiError::Validation(_))));
    }
}

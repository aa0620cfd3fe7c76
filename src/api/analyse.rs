use axum::{
    Form, Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::{
    analysis::{AnalysisReport, CommentSource},
    app::AppState,
};

use super::{
    error::{ApiError, FieldErrors},
    extract::AuthenticatedUser,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AnalyseForm {
    input: String,
}

/// `POST /analyse_comments/{source}`
///
/// `input` is a video URL or id for `youtube_video`, the comment text for
/// `manually_entered`. An unknown source is reported before the input is
/// looked at.
pub(crate) async fn analyse_comments(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(source): Path<String>,
    Form(form): Form<AnalyseForm>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let known_source = source.parse::<CommentSource>().is_ok();
    if known_source && form.input.trim().is_empty() {
        return Err(ApiError::Validation(FieldErrors::single(
            "input",
            "Cannot analyse an empty comment!",
        )));
    }

    let report = state
        .analyser()
        .analyse_comments(&source, &form.input)
        .await?;
    Ok(Json(report))
}

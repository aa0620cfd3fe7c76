use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    analysis::ClassificationRegistry,
    app::AppState,
    store::{IssueDao, models::{Issue, IssueView, NewIssue}},
};

use super::{
    error::{ApiError, FieldErrors},
    extract::AuthenticatedUser,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct IssueForm {
    comment: String,
    issue: String,
    classification_id: String,
}

/// Issue form after validation.
#[derive(Debug, PartialEq, Eq)]
struct ValidIssue {
    comment: String,
    issue: Option<String>,
    classification_id: i64,
}

#[derive(Debug, Serialize)]
struct IssueList {
    issues: Vec<IssueView>,
}

#[derive(Debug, Serialize)]
struct CreatedIssue {
    issue_id: i64,
}

#[derive(Debug, Serialize)]
struct Deleted {
    message: String,
}

impl IssueForm {
    fn validate(self) -> Result<ValidIssue, ApiError> {
        let mut errors = FieldErrors::new();

        let comment = self.comment.trim().to_string();
        if comment.is_empty() {
            errors.push("comment", "The issues's comment is required!");
        }

        let raw_id = self.classification_id.trim();
        let classification_id = if raw_id.is_empty() {
            errors.push("classification_id", "A classification_id is required!");
            None
        } else {
            match raw_id.parse::<i64>() {
                Ok(0) => {
                    errors.push("classification_id", "A classification_id is required!");
                    None
                }
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push("classification_id", "Not a valid integer value.");
                    None
                }
            }
        };

        errors.into_result()?;
        let Some(classification_id) = classification_id else {
            return Err(ApiError::Validation(FieldErrors::single(
                "classification_id",
                "A classification_id is required!",
            )));
        };
        let issue = Some(self.issue.trim().to_string()).filter(|issue| !issue.is_empty());
        Ok(ValidIssue {
            comment,
            issue,
            classification_id,
        })
    }
}

async fn ensure_classification(state: &AppState, classification_id: i64) -> Result<(), ApiError> {
    if state.store().find_by_id(classification_id).await?.is_none() {
        return Err(ApiError::Validation(FieldErrors::single(
            "classification_id",
            format!("Classification id {classification_id} is not registered."),
        )));
    }
    Ok(())
}

/// Load an issue the caller is allowed to modify.
async fn owned_issue(state: &AppState, issue_id: i64, user: &AuthenticatedUser) -> Result<Issue, ApiError> {
    let Some(issue) = state.store().get_issue(issue_id).await? else {
        return Err(ApiError::NotFound(format!(
            "Issue with the id '{issue_id}' doesn't exist."
        )));
    };
    if issue.author_id != user.user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(issue)
}

/// `GET /analyser`
pub(crate) async fn list_issues(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let issues = state.store().list_issues().await?;
    Ok(Json(IssueList { issues }))
}

/// `POST /issues`
pub(crate) async fn create_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Form(form): Form<IssueForm>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = form.validate()?;
    ensure_classification(&state, valid.classification_id).await?;

    let new_issue = NewIssue::new(valid.comment, user.user_id, valid.classification_id)
        .with_message(valid.issue);
    let issue_id = state.store().create_issue(&new_issue).await?;

    info!(issue_id, author_id = user.user_id, "issue raised");
    Ok((StatusCode::CREATED, Json(CreatedIssue { issue_id })))
}

/// `GET /issues/{id}`
pub(crate) async fn get_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(issue_id): Path<i64>,
) -> Result<Json<Issue>, ApiError> {
    owned_issue(&state, issue_id, &user).await.map(Json)
}

/// `POST /issues/{id}/update`. Only the issue message changes.
pub(crate) async fn update_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(issue_id): Path<i64>,
    Form(form): Form<IssueForm>,
) -> Result<Json<Issue>, ApiError> {
    owned_issue(&state, issue_id, &user).await?;
    let valid = form.validate()?;
    ensure_classification(&state, valid.classification_id).await?;

    let store = state.store();
    if !store
        .update_issue_message(issue_id, valid.issue.as_deref())
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "Issue with the id '{issue_id}' doesn't exist."
        )));
    }
    info!(issue_id, "issue updated");

    owned_issue(&state, issue_id, &user).await.map(Json)
}

/// `POST /issues/{id}/delete`
pub(crate) async fn delete_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(issue_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = owned_issue(&state, issue_id, &user).await?;
    if !state.store().delete_issue(issue.issue_id).await? {
        return Err(ApiError::NotFound(format!(
            "Issue with the id '{issue_id}' doesn't exist."
        )));
    }

    info!(issue_id, "issue deleted");
    Ok(Json(Deleted {
        message: format!("Issue number {} deleted.", issue.issue_id),
    }))
}

use axum::{Json, extract::State};
use serde::Serialize;

use crate::{
    app::AppState,
    store::{IssueDao, models::IssueView},
};

use super::{error::ApiError, extract::AuthenticatedUser};

#[derive(Debug, Serialize)]
pub(crate) struct AccountSummary {
    user_id: i64,
    email: String,
    issues: Vec<IssueView>,
}

/// `GET /account`: the caller and the issues they raised.
pub(crate) async fn account(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<AccountSummary>, ApiError> {
    let issues = state.store().list_issues_by_author(user.user_id).await?;
    Ok(Json(AccountSummary {
        user_id: user.user_id,
        email: user.email,
        issues,
    }))
}

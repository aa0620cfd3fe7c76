use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub password_hash: String,
}

/// Issue as submitted by its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub comment: String,
    pub issue: Option<String>,
    pub author_id: i64,
    pub classification_id: i64,
}

impl NewIssue {
    pub fn new(comment: impl Into<String>, author_id: i64, classification_id: i64) -> Self {
        Self {
            comment: comment.into(),
            issue: None,
            author_id,
            classification_id,
        }
    }

    #[must_use]
    pub fn with_message(mut self, issue: Option<String>) -> Self {
        self.issue = issue;
        self
    }
}

/// Stored issue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub issue_id: i64,
    pub comment: String,
    pub issue: Option<String>,
    pub date_created: DateTime<Utc>,
    pub author_id: i64,
    pub classification_id: i64,
}

/// Issue joined with its author and classification for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueView {
    pub issue_id: i64,
    pub comment: String,
    pub issue: Option<String>,
    pub date_created: DateTime<Utc>,
    pub author_id: i64,
    pub author_email: String,
    pub classification_id: i64,
    pub classification: String,
}

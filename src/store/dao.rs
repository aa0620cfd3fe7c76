//! DAO trait definitions for issues and users.
//!
//! Classification lookups go through
//! [`ClassificationRegistry`](crate::analysis::labeler::ClassificationRegistry).

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Issue, IssueView, NewIssue, User};

#[async_trait]
pub trait IssueDao: Send + Sync {
    /// Insert an issue and return its id.
    async fn create_issue(&self, issue: &NewIssue) -> Result<i64>;

    async fn get_issue(&self, issue_id: i64) -> Result<Option<Issue>>;

    /// Replace the issue message. Returns `false` when no row matched.
    async fn update_issue_message(&self, issue_id: i64, issue: Option<&str>) -> Result<bool>;

    /// Returns `false` when no row matched.
    async fn delete_issue(&self, issue_id: i64) -> Result<bool>;

    /// Every issue, newest first.
    async fn list_issues(&self) -> Result<Vec<IssueView>>;

    /// Issues raised by one author, newest first.
    async fn list_issues_by_author(&self, author_id: i64) -> Result<Vec<IssueView>>;
}

#[async_trait]
pub trait UserDao: Send + Sync {
    /// Insert a user. `Ok(None)` when the email is already registered.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<Option<i64>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>>;
}

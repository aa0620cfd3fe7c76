use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::dao::{IssueDao, UserDao};
use super::models::{Issue, IssueView, NewIssue, User};
use crate::analysis::labeler::{Classification, ClassificationRegistry};

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS classifications (
        classification_id INTEGER PRIMARY KEY,
        classification TEXT NOT NULL UNIQUE
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS issues (
        issue_id INTEGER PRIMARY KEY AUTOINCREMENT,
        comment TEXT NOT NULL,
        issue TEXT,
        date_created TEXT NOT NULL,
        author_id INTEGER NOT NULL REFERENCES users (user_id) ON DELETE CASCADE,
        classification_id INTEGER NOT NULL REFERENCES classifications (classification_id)
    )
    ",
    "CREATE INDEX IF NOT EXISTS issues_author_id_idx ON issues (author_id)",
    r"
    INSERT OR IGNORE INTO classifications (classification_id, classification)
    VALUES (1, 'Misinformation'), (2, 'Neutral')
    ",
];

const DROP_SCHEMA: &[&str] = &[
    "DROP TABLE IF EXISTS issues",
    "DROP TABLE IF EXISTS classifications",
    "DROP TABLE IF EXISTS users",
];

const ISSUE_VIEW_SELECT: &str = r"
    SELECT i.issue_id, i.comment, i.issue, i.date_created, i.author_id,
           u.email AS author_email, c.classification_id, c.classification
    FROM issues AS i
    INNER JOIN users AS u ON u.user_id = i.author_id
    INNER JOIN classifications AS c ON c.classification_id = i.classification_id
";

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct SqliteSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// SQLite-backed implementation of every DAO trait.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Configure a lazily connecting pool. The database file is created on
    /// first connection when missing.
    ///
    /// # Errors
    /// Fails when the URL cannot be parsed.
    pub fn connect_lazy(settings: &SqliteSettings) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .with_context(|| format!("invalid sqlite url: {}", settings.url))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// Single-connection in-memory database with the schema applied.
    ///
    /// # Errors
    /// Fails when the connection or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory sqlite url")?
            .foreign_keys(true);
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to open in-memory sqlite database")?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create missing tables and seed the classifications. Idempotent.
    ///
    /// # Errors
    /// Fails when any statement fails.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("failed to apply schema statement")?;
        }
        Ok(())
    }

    /// Drop every table and recreate the schema.
    ///
    /// # Errors
    /// Fails when any statement fails.
    pub async fn reset_schema(&self) -> Result<()> {
        for statement in DROP_SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("failed to drop table")?;
        }
        self.init_schema().await?;
        info!("database schema recreated");
        Ok(())
    }

    /// # Errors
    /// Fails when the database cannot be reached.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn fetch_issue_views(&self, author_id: Option<i64>) -> Result<Vec<IssueView>> {
        let rows = match author_id {
            Some(author_id) => {
                let sql = format!(
                    "{ISSUE_VIEW_SELECT} WHERE i.author_id = ? ORDER BY i.date_created DESC, i.issue_id DESC"
                );
                sqlx::query(&sql)
                    .bind(author_id)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql =
                    format!("{ISSUE_VIEW_SELECT} ORDER BY i.date_created DESC, i.issue_id DESC");
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
        }
        .context("failed to list issues")?;

        rows.iter()
            .map(issue_view_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to decode issue row")
    }
}

fn issue_view_from_row(row: &SqliteRow) -> Result<IssueView, sqlx::Error> {
    Ok(IssueView {
        issue_id: row.try_get("issue_id")?,
        comment: row.try_get("comment")?,
        issue: row.try_get("issue")?,
        date_created: row.try_get::<DateTime<Utc>, _>("date_created")?,
        author_id: row.try_get("author_id")?,
        author_email: row.try_get("author_email")?,
        classification_id: row.try_get("classification_id")?,
        classification: row.try_get("classification")?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
    })
}

fn classification_from_row(row: &SqliteRow) -> Result<Classification, sqlx::Error> {
    Ok(Classification {
        id: row.try_get("classification_id")?,
        name: row.try_get("classification")?,
    })
}

#[async_trait]
impl ClassificationRegistry for SqliteStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Classification>> {
        let row = sqlx::query(
            "SELECT classification_id, classification FROM classifications WHERE classification = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up classification by name")?;

        row.as_ref()
            .map(classification_from_row)
            .transpose()
            .context("failed to decode classification row")
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Classification>> {
        let row = sqlx::query(
            "SELECT classification_id, classification FROM classifications WHERE classification_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up classification by id")?;

        row.as_ref()
            .map(classification_from_row)
            .transpose()
            .context("failed to decode classification row")
    }
}

#[async_trait]
impl IssueDao for SqliteStore {
    async fn create_issue(&self, issue: &NewIssue) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO issues (comment, issue, date_created, author_id, classification_id)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(&issue.comment)
        .bind(issue.issue.as_deref())
        .bind(Utc::now())
        .bind(issue.author_id)
        .bind(issue.classification_id)
        .execute(&self.pool)
        .await
        .context("failed to insert issue")?;

        Ok(result.last_insert_rowid())
    }

    async fn get_issue(&self, issue_id: i64) -> Result<Option<Issue>> {
        let row = sqlx::query(
            r"
            SELECT issue_id, comment, issue, date_created, author_id, classification_id
            FROM issues
            WHERE issue_id = ?
            ",
        )
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch issue")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Issue {
            issue_id: row.try_get("issue_id")?,
            comment: row.try_get("comment")?,
            issue: row.try_get("issue")?,
            date_created: row.try_get("date_created")?,
            author_id: row.try_get("author_id")?,
            classification_id: row.try_get("classification_id")?,
        }))
    }

    async fn update_issue_message(&self, issue_id: i64, issue: Option<&str>) -> Result<bool> {
        let result = sqlx::query("UPDATE issues SET issue = ? WHERE issue_id = ?")
            .bind(issue)
            .bind(issue_id)
            .execute(&self.pool)
            .await
            .context("failed to update issue")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_issue(&self, issue_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM issues WHERE issue_id = ?")
            .bind(issue_id)
            .execute(&self.pool)
            .await
            .context("failed to delete issue")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_issues(&self) -> Result<Vec<IssueView>> {
        self.fetch_issue_views(None).await
    }

    async fn list_issues_by_author(&self, author_id: i64) -> Result<Vec<IssueView>> {
        self.fetch_issue_views(Some(author_id)).await
    }
}

#[async_trait]
impl UserDao for SqliteStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<Option<i64>> {
        let result = sqlx::query("INSERT INTO users (email, password) VALUES (?, ?)")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_rowid())),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => Ok(None),
            Err(error) => Err(anyhow::Error::new(error).context("failed to insert user")),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT user_id, email, password FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch user by email")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user row")
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT user_id, email, password FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch user by id")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user row")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user(email: &str) -> (SqliteStore, i64) {
        let store = SqliteStore::in_memory().await.expect("in-memory store");
        let user_id = store
            .create_user(email, "pbkdf2-sha256$1000$salt$digest")
            .await
            .expect("insert user")
            .expect("fresh email");
        (store, user_id)
    }

    #[tokio::test]
    async fn schema_seeds_both_classifications() {
        let store = SqliteStore::in_memory().await.unwrap();
        // applying twice must not duplicate rows
        store.init_schema().await.unwrap();

        let misinformation = store.find_by_name("Misinformation").await.unwrap().unwrap();
        assert_eq!(misinformation.id, 1);
        let neutral = store.find_by_id(2).await.unwrap().unwrap();
        assert_eq!(neutral.name, "Neutral");
        assert!(store.find_by_name("Satire").await.unwrap().is_none());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classifications")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn duplicate_email_is_reported_as_none() {
        let (store, user_id) = store_with_user("reader@example.com").await;
        assert!(user_id > 0);

        let again = store
            .create_user("reader@example.com", "other")
            .await
            .unwrap();
        assert!(again.is_none());

        let user = store
            .find_user_by_email("reader@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.password_hash, "pbkdf2-sha256$1000$salt$digest");
    }

    #[tokio::test]
    async fn issue_lifecycle() {
        let (store, user_id) = store_with_user("reader@example.com").await;

        let issue_id = store
            .create_issue(
                &NewIssue::new("5G spreads viruses", user_id, 1)
                    .with_message(Some("Clearly misinformation".to_string())),
            )
            .await
            .unwrap();

        let issue = store.get_issue(issue_id).await.unwrap().unwrap();
        assert_eq!(issue.comment, "5G spreads viruses");
        assert_eq!(issue.issue.as_deref(), Some("Clearly misinformation"));
        assert_eq!(issue.author_id, user_id);

        assert!(store.update_issue_message(issue_id, Some("edited")).await.unwrap());
        let issue = store.get_issue(issue_id).await.unwrap().unwrap();
        assert_eq!(issue.issue.as_deref(), Some("edited"));

        assert!(store.delete_issue(issue_id).await.unwrap());
        assert!(store.get_issue(issue_id).await.unwrap().is_none());
        assert!(!store.delete_issue(issue_id).await.unwrap());
        assert!(!store.update_issue_message(issue_id, None).await.unwrap());
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_filter_by_author() {
        let (store, alice) = store_with_user("alice@example.com").await;
        let bob = store
            .create_user("bob@example.com", "hash")
            .await
            .unwrap()
            .unwrap();

        let first = store
            .create_issue(&NewIssue::new("first", alice, 1))
            .await
            .unwrap();
        let second = store
            .create_issue(&NewIssue::new("second", bob, 2))
            .await
            .unwrap();

        let all = store.list_issues().await.unwrap();
        let ids: Vec<_> = all.iter().map(|view| view.issue_id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(all[0].author_email, "bob@example.com");
        assert_eq!(all[0].classification, "Neutral");

        let mine = store.list_issues_by_author(alice).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].classification, "Misinformation");
    }

    #[tokio::test]
    async fn unknown_classification_violates_foreign_key() {
        let (store, user_id) = store_with_user("reader@example.com").await;
        let result = store
            .create_issue(&NewIssue::new("comment", user_id, 99))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reset_schema_clears_data() {
        let (store, _) = store_with_user("reader@example.com").await;
        store.reset_schema().await.unwrap();
        assert!(
            store
                .find_user_by_email("reader@example.com")
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.find_by_id(1).await.unwrap().is_some());
        store.ping().await.unwrap();
    }
}

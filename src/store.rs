pub mod dao;
pub mod models;
pub mod sqlite;

pub use dao::{IssueDao, UserDao};
pub use sqlite::{SqliteSettings, SqliteStore};

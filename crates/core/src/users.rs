//! Operator accounts and the SQLite credential store.
//!
//! Accounts are managed out-of-band with the `bucketview` CLI; the web
//! application only reads them at login and toggles the `authenticated` flag.

use crate::{ExplorerError, ExplorerResult};
use async_trait::async_trait;
use bucketview_types::EmailAddress;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use std::sync::OnceLock;

/// bcrypt work factor for new password hashes.
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

const CREATE_USER_TABLE: &str = "CREATE TABLE IF NOT EXISTS user (
    email TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    authenticated BOOLEAN NOT NULL DEFAULT 0
)";

#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct User {
    pub email: String,
    pub password_hash: String,
    pub authenticated: bool,
}

impl User {
    /// Creates an account with a freshly salted hash of `password`.
    pub fn new(email: &EmailAddress, password: &str, cost: u32) -> ExplorerResult<Self> {
        Ok(Self {
            email: email.to_string(),
            password_hash: hash_password(password, cost)?,
            authenticated: false,
        })
    }

    /// Checks `password` against the stored hash.
    ///
    /// A malformed stored hash counts as a mismatch.
    pub fn check_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

pub fn hash_password(password: &str, cost: u32) -> ExplorerResult<String> {
    if password.is_empty() {
        return Err(ExplorerError::InvalidInput("password cannot be empty".into()));
    }
    Ok(bcrypt::hash(password, cost)?)
}

/// Burns the same bcrypt work as a real check, for logins with an unknown
/// email. Always returns false.
pub fn verify_dummy_password(password: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    let hash = DUMMY_HASH.get_or_init(|| bcrypt::hash("bucketview-dummy", DEFAULT_HASH_COST).ok());
    if let Some(hash) = hash {
        let _ = bcrypt::verify(password, hash);
    }
    false
}

/// Persistence for operator accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> ExplorerResult<Option<User>>;

    /// # Errors
    ///
    /// Returns `ExplorerError::UserExists` if the email is already registered.
    async fn create(&self, user: &User) -> ExplorerResult<()>;

    /// # Errors
    ///
    /// Returns `ExplorerError::UserNotFound` if no such account exists.
    async fn update_password(&self, email: &str, password_hash: &str) -> ExplorerResult<()>;

    /// # Errors
    ///
    /// Returns `ExplorerError::UserNotFound` if no such account exists.
    async fn delete(&self, email: &str) -> ExplorerResult<()>;

    async fn list(&self) -> ExplorerResult<Vec<User>>;

    async fn set_authenticated(&self, email: &str, authenticated: bool) -> ExplorerResult<()>;
}

/// [`UserStore`] backed by a single SQLite table.
#[derive(Clone, Debug)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    /// Opens (creating if needed) the database file at `path` and ensures the
    /// schema exists.
    pub async fn connect(path: &Path) -> ExplorerResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> ExplorerResult<()> {
        sqlx::query(CREATE_USER_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_email(&self, email: &str) -> ExplorerResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT email, password_hash, authenticated FROM user WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: &User) -> ExplorerResult<()> {
        let result = sqlx::query(
            "INSERT INTO user (email, password_hash, authenticated) VALUES ($1, $2, $3)",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.authenticated)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(ExplorerError::UserExists(user.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> ExplorerResult<()> {
        let result = sqlx::query("UPDATE user SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(email)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ExplorerError::UserNotFound(email.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, email: &str) -> ExplorerResult<()> {
        let result = sqlx::query("DELETE FROM user WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ExplorerError::UserNotFound(email.to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> ExplorerResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT email, password_hash, authenticated FROM user ORDER BY email",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn set_authenticated(&self, email: &str, authenticated: bool) -> ExplorerResult<()> {
        sqlx::query("UPDATE user SET authenticated = $1 WHERE email = $2")
            .bind(authenticated)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_COST: u32 = 4;

    async fn memory_store() -> SqliteUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteUserStore::from_pool(pool);
        store.init_schema().await.unwrap();
        store
    }

    fn user(email: &str, password: &str) -> User {
        User::new(&EmailAddress::parse(email).unwrap(), password, TEST_COST).unwrap()
    }

    #[test]
    fn test_password_check() {
        let u = user("ops@example.com", "correct horse");
        assert_ne!(u.password_hash, "correct horse");
        assert!(u.check_password("correct horse"));
        assert!(!u.check_password("wrong"));
        assert!(!verify_dummy_password("correct horse"));
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(
            hash_password("", TEST_COST),
            Err(ExplorerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_create_find_and_duplicate() {
        let store = memory_store().await;
        store.create(&user("ops@example.com", "pw")).await.unwrap();

        let found = store.find_by_email("ops@example.com").await.unwrap().unwrap();
        assert!(found.check_password("pw"));
        assert!(!found.authenticated);
        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());

        let duplicate = store.create(&user("ops@example.com", "other")).await;
        assert!(matches!(duplicate, Err(ExplorerError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_update_delete_and_list() {
        let store = memory_store().await;
        store.create(&user("b@example.com", "one")).await.unwrap();
        store.create(&user("a@example.com", "one")).await.unwrap();

        let new_hash = hash_password("two", TEST_COST).unwrap();
        store.update_password("b@example.com", &new_hash).await.unwrap();
        let b = store.find_by_email("b@example.com").await.unwrap().unwrap();
        assert!(b.check_password("two"));

        let emails: Vec<String> = store.list().await.unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, ["a@example.com", "b@example.com"]);

        store.delete("a@example.com").await.unwrap();
        assert!(matches!(
            store.delete("a@example.com").await,
            Err(ExplorerError::UserNotFound(_))
        ));
        assert!(matches!(
            store.update_password("a@example.com", &new_hash).await,
            Err(ExplorerError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticated_flag() {
        let store = memory_store().await;
        store.create(&user("ops@example.com", "pw")).await.unwrap();

        store.set_authenticated("ops@example.com", true).await.unwrap();
        assert!(store.find_by_email("ops@example.com").await.unwrap().unwrap().authenticated);

        store.set_authenticated("ops@example.com", false).await.unwrap();
        assert!(!store.find_by_email("ops@example.com").await.unwrap().unwrap().authenticated);
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("users.db");

        let store = SqliteUserStore::connect(&path).await.unwrap();
        store.create(&user("ops@example.com", "pw")).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}

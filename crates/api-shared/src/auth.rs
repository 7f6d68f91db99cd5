use bucketview_core::users::verify_dummy_password;
use bucketview_core::{ExplorerError, User, UserStore};
use bucketview_types::EmailAddress;

/// Errors returned while checking login credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email, malformed email and wrong password all map here.
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("credential store error: {0}")]
    Store(#[from] ExplorerError),
    #[error("password check aborted: {0}")]
    Task(String),
}

/// Checks `email` and `password` against the user store.
///
/// bcrypt runs on the blocking pool. When the account does not exist a dummy
/// hash is verified instead, so both failure modes take the same time.
///
/// # Returns
///
/// The matching [`User`] on success.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` for any credential mismatch, and
/// `AuthError::Store` if the store cannot be queried.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = match EmailAddress::parse(email) {
        Ok(email) => store.find_by_email(email.as_str()).await?,
        Err(_) => None,
    };

    let password = password.to_string();
    let verified = tokio::task::spawn_blocking(move || match user {
        Some(user) if user.check_password(&password) => Some(user),
        Some(_) => None,
        None => {
            verify_dummy_password(&password);
            None
        }
    })
    .await
    .map_err(|e| AuthError::Task(e.to_string()))?;

    verified.ok_or(AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketview_core::SqliteUserStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store_with(email: &str, password: &str) -> SqliteUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteUserStore::from_pool(pool);
        store.init_schema().await.unwrap();
        let user = User::new(&EmailAddress::parse(email).unwrap(), password, 4).unwrap();
        store.create(&user).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let store = store_with("ops@example.com", "pw").await;

        let user = authenticate(&store, "OPS@example.com", "pw").await.unwrap();
        assert_eq!(user.email, "ops@example.com");
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let store = store_with("ops@example.com", "pw").await;

        let wrong_password = authenticate(&store, "ops@example.com", "nope").await.unwrap_err();
        let unknown_email = authenticate(&store, "who@example.com", "pw").await.unwrap_err();
        let malformed = authenticate(&store, "not-an-email", "pw").await.unwrap_err();

        for err in [wrong_password, unknown_email, malformed] {
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(err.to_string(), "Invalid username or password");
        }
    }
}

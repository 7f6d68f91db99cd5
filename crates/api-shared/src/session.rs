//! Server-side sessions.
//!
//! A session is a random id carried in a signed cookie, mapped here to the
//! signed-in email, an expiry and a queue of flash notices. Only a successful
//! login creates a session; notices for anonymous visitors travel in a signed
//! cookie instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
        }
    }
}

/// A one-shot notice shown on the next rendered page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct Session {
    email: String,
    expires_at: Instant,
    flashes: Vec<Flash>,
}

/// A freshly issued session id and how long its cookie should live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedSession {
    pub id: String,
    pub ttl: Duration,
    /// True when the cookie should outlive the browser session.
    pub persistent: bool,
}

/// In-memory session table shared by all requests.
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
    remember_ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration, remember_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            remember_ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Email of the signed-in user for session `id`, if the session is live
    /// and authenticated.
    pub async fn current_user(&self, id: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|s| s.expires_at > Instant::now())
            .map(|s| s.email.clone())
    }

    /// Number of sessions held, expired ones included until the next prune.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Signs `email` in under a brand-new session id.
    ///
    /// The previous session, if any, is discarded and its pending notices move
    /// to the new one.
    pub async fn login(&self, previous: Option<&str>, email: &str, remember: bool) -> IssuedSession {
        let ttl = if remember { self.remember_ttl } else { self.ttl };
        let id = new_session_id();

        let mut sessions = self.sessions.write().await;
        prune(&mut sessions);
        let flashes = previous
            .and_then(|old| sessions.remove(old))
            .map(|s| s.flashes)
            .unwrap_or_default();
        sessions.insert(
            id.clone(),
            Session {
                email: email.to_string(),
                expires_at: Instant::now() + ttl,
                flashes,
            },
        );

        IssuedSession {
            id,
            ttl,
            persistent: remember,
        }
    }

    /// Ends session `id`, returning the email that was signed in.
    pub async fn logout(&self, id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).map(|s| s.email)
    }

    /// Queues `flash` on session `id`.
    ///
    /// Returns false, dropping the notice, when the session is missing or
    /// expired.
    pub async fn push_flash(&self, id: &str, flash: Flash) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if session.expires_at > Instant::now() => {
                session.flashes.push(flash);
                true
            }
            _ => false,
        }
    }

    /// Removes and returns the pending notices of session `id`.
    pub async fn take_flashes(&self, id: &str) -> Vec<Flash> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if session.expires_at > Instant::now() => {
                std::mem::take(&mut session.flashes)
            }
            _ => Vec::new(),
        }
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn prune(sessions: &mut HashMap<String, Session>) {
    let now = Instant::now();
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    if sessions.len() < before {
        tracing::debug!("pruned {} expired sessions", before - sessions.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60), Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_login_issues_new_id_and_drops_old() {
        let store = store();
        let first = store.login(None, "ops@example.com", false).await;
        assert!(store.push_flash(&first.id, Flash::success("Created reports")).await);

        let issued = store.login(Some(&first.id), "ops@example.com", false).await;

        assert_ne!(issued.id, first.id);
        assert!(!issued.persistent);
        assert_eq!(issued.ttl, Duration::from_secs(60));
        assert_eq!(
            store.current_user(&issued.id).await.as_deref(),
            Some("ops@example.com")
        );
        assert_eq!(store.current_user(&first.id).await, None);
        assert!(store.take_flashes(&first.id).await.is_empty());
        assert_eq!(store.take_flashes(&issued.id).await.len(), 1);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_flash_without_session_is_not_stored() {
        let store = store();

        for _ in 0..1000 {
            assert!(!store.push_flash("unknown", Flash::error("Invalid username or password")).await);
        }

        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_remember_me_uses_long_ttl() {
        let issued = store().login(None, "ops@example.com", true).await;
        assert!(issued.persistent);
        assert_eq!(issued.ttl, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_flashes_are_one_shot() {
        let store = store();
        let issued = store.login(None, "ops@example.com", false).await;

        assert!(store.push_flash(&issued.id, Flash::success("Created reports")).await);
        let flashes = store.take_flashes(&issued.id).await;
        assert_eq!(flashes, [Flash::success("Created reports")]);
        assert!(store.take_flashes(&issued.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let store = store();
        let issued = store.login(None, "ops@example.com", false).await;

        assert_eq!(store.logout(&issued.id).await.as_deref(), Some("ops@example.com"));
        assert_eq!(store.current_user(&issued.id).await, None);
        assert_eq!(store.logout(&issued.id).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_anonymous() {
        let store = store();
        let issued = store.login(None, "ops@example.com", false).await;

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.current_user(&issued.id).await, None);
        assert!(!store.push_flash(&issued.id, Flash::error("expired")).await);
        assert!(store.take_flashes(&issued.id).await.is_empty());

        store.login(None, "ops@example.com", false).await;
        assert_eq!(store.count().await, 1);
    }
}

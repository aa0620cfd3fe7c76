use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct Session {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

/// In-process bearer token store.
#[derive(Debug)]
pub struct SessionStore {
    ttl: chrono::Duration,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session for `user_id` and return its token. Expired sessions
    /// are dropped first so abandoned tokens do not accumulate.
    pub fn issue(&self, user_id: i64) -> Uuid {
        let token = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut sessions = self.sessions.write();
        retain_live(&mut sessions, now);
        sessions.insert(
            token,
            Session {
                user_id,
                expires_at,
            },
        );
        token
    }

    /// User behind `token`, if the session exists and has not expired.
    pub fn resolve(&self, token: Uuid) -> Option<i64> {
        let session = self.sessions.read().get(&token).copied()?;
        if session.expires_at <= Utc::now() {
            self.sessions.write().remove(&token);
            return None;
        }
        Some(session.user_id)
    }

    /// End the session. Returns `false` for unknown tokens.
    pub fn revoke(&self, token: Uuid) -> bool {
        self.sessions.write().remove(&token).is_some()
    }

    /// Drop every expired session and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        retain_live(&mut self.sessions.write(), Utc::now())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

fn retain_live(sessions: &mut HashMap<Uuid, Session>, now: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|_, session| session.expires_at > now);
    before - sessions.len()
}

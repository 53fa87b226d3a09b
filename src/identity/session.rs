//! Authenticated sessions handed to the presentation layer.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::onboarding::model::Partition;

use super::Identity;

/// A signed-in user, passed explicitly to onboarding operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub partition: Partition,
    pub identity: Identity,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(partition: Partition, identity: Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            partition,
            identity,
            started_at: Utc::now(),
        }
    }
}

/// How long a session stays valid after sign-in.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 12 * 60;

/// In-memory table of live sessions, keyed by session token.
///
/// Holds at most one session per (partition, uid); sessions older than the
/// TTL are never returned and are dropped by [`SessionTable::expire_old`].
pub struct SessionTable {
    sessions: RwLock<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl SessionTable {
    pub fn new() -> Arc<Self> {
        Self::with_ttl(Duration::minutes(DEFAULT_SESSION_TTL_MINUTES))
    }

    pub fn with_ttl(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        })
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.started_at >= self.ttl
    }

    /// Store a session, replacing any earlier session of the same account.
    pub async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| {
            !(s.partition == session.partition && s.identity.uid == session.identity.uid)
        });
        let replaced = before - sessions.len();

        debug!(
            session_id = %session.id,
            uid = %session.identity.uid,
            replaced,
            "Session opened"
        );
        sessions.insert(session.id, session);
    }

    /// Look up a live session. An expired entry is dropped on access.
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                Some(s) if !self.is_expired(s, now) => return Some(s.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.remove(id).await;
        None
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            debug!(session_id = %id, "Session closed");
        }
        removed
    }

    /// Drop every session past the TTL. Returns how many were dropped.
    pub async fn expire_old(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "Expired sessions dropped");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Spawn a background task that periodically drops expired sessions.
pub fn spawn_expiry_task(table: Arc<SessionTable>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            table.expire_old().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            uid: "u1".into(),
            email: "a@x.com".into(),
            display_name: "A".into(),
            photo_url: None,
            email_verified: true,
            provider: "google".into(),
        }
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let table = SessionTable::new();
        let session = Session::new(Partition::Provider, identity());
        let id = session.id;

        table.insert(session.clone()).await;
        assert_eq!(table.get(id).await, Some(session));
        assert_eq!(table.len().await, 1);

        assert!(table.remove(id).await);
        assert!(table.get(id).await.is_none());
        assert!(!table.remove(id).await);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let a = Session::new(Partition::Provider, identity());
        let b = Session::new(Partition::Provider, identity());
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn new_session_replaces_earlier_one_for_same_account() {
        let table = SessionTable::new();
        let first = Session::new(Partition::Provider, identity());
        let second = Session::new(Partition::Provider, identity());
        let other_partition = Session::new(Partition::Direct, identity());

        table.insert(first.clone()).await;
        table.insert(other_partition.clone()).await;
        table.insert(second.clone()).await;

        assert_eq!(table.len().await, 2);
        assert!(table.get(first.id).await.is_none());
        assert_eq!(table.get(second.id).await, Some(second));
        assert!(table.get(other_partition.id).await.is_some());
    }

    #[tokio::test]
    async fn expired_sessions_are_not_returned() {
        let table = SessionTable::with_ttl(Duration::minutes(30));
        let mut stale = Session::new(Partition::Provider, identity());
        stale.started_at = Utc::now() - Duration::minutes(31);
        let id = stale.id;

        table.insert(stale).await;
        assert!(table.get(id).await.is_none());
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn expire_old_drops_only_stale_sessions() {
        let table = SessionTable::with_ttl(Duration::minutes(30));
        let mut stale = Session::new(Partition::Provider, identity());
        stale.started_at = Utc::now() - Duration::hours(2);
        let fresh = Session::new(
            Partition::Provider,
            Identity {
                uid: "u2".into(),
                ..identity()
            },
        );

        table.insert(stale).await;
        table.insert(fresh.clone()).await;

        assert_eq!(table.expire_old().await, 1);
        assert_eq!(table.len().await, 1);
        assert!(table.get(fresh.id).await.is_some());
    }
}

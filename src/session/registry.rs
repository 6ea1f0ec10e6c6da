//! Bookkeeping of live QR sessions
//!
//! One entry per open stream. Entries are touched on every poll tick and
//! removed when the session task finishes; a periodic sweep drops entries
//! whose task stopped touching them.
//!
//! ```rust
//! use bili_qr_login::{session::SessionRegistry, types::ClientKind};
//!
//! # tokio_test::block_on(async {
//! let registry = SessionRegistry::new();
//! let id = registry.register("203.0.113.7", "Mozilla/5.0", ClientKind::Web).await;
//! assert!(registry.touch(id).await);
//! assert!(registry.remove(id).await);
//! assert!(!registry.remove(id).await);
//! # });
//! ```

use crate::types::ClientKind;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Longest user agent prefix kept per session
pub const USER_AGENT_PREFIX_LEN: usize = 100;

/// One open QR stream
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub id: u64,
    pub remote_address: String,
    pub user_agent_prefix: String,
    pub client: ClientKind,
    pub connect_time: DateTime<Utc>,
    pub last_active: Instant,
}

impl ClientSession {
    pub fn new(id: u64, remote_address: impl Into<String>, user_agent: &str, client: ClientKind) -> Self {
        Self {
            id,
            remote_address: remote_address.into(),
            user_agent_prefix: user_agent.chars().take(USER_AGENT_PREFIX_LEN).collect(),
            client,
            connect_time: Utc::now(),
            last_active: Instant::now(),
        }
    }
}

/// Registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub active: usize,
    pub total_connected: u64,
    pub total_removed: u64,
    pub total_swept: u64,
}

/// Process-wide table of open sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<u64, ClientSession>>,
    next_id: AtomicU64,
    total_connected: AtomicU64,
    total_removed: AtomicU64,
    total_swept: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and record a new session
    pub async fn register(&self, remote_address: &str, user_agent: &str, client: ClientKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let session = ClientSession::new(id, remote_address, user_agent, client);

        self.sessions.write().await.insert(id, session);
        self.total_connected.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            session_id = id,
            remote_address,
            client = %client,
            "Session registered"
        );
        id
    }

    /// Mark a session active now. Returns false when it is gone.
    pub async fn touch(&self, id: u64) -> bool {
        match self.sessions.write().await.get_mut(&id) {
            Some(session) => {
                session.last_active = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Remove a session. Only the first call for an id returns true.
    pub async fn remove(&self, id: u64) -> bool {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(session) => {
                self.total_removed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    session_id = id,
                    connected_secs = (Utc::now() - session.connect_time).num_seconds(),
                    "Session removed"
                );
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: u64) -> Option<ClientSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle for longer than `inactivity`, returning how many went
    pub async fn sweep(&self, inactivity: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, session| {
            let idle = now.duration_since(session.last_active);
            let keep = idle <= inactivity;
            if !keep {
                tracing::warn!(
                    session_id = *id,
                    idle_secs = idle.as_secs(),
                    "Sweeping inactive session"
                );
            }
            keep
        });

        let swept = before - sessions.len();
        if swept > 0 {
            self.total_swept.fetch_add(swept as u64, Ordering::Relaxed);
            self.total_removed.fetch_add(swept as u64, Ordering::Relaxed);
        }
        swept
    }

    /// Run [`SessionRegistry::sweep`] every `every` until the task is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, inactivity: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = registry.sweep(inactivity).await;
                if swept > 0 {
                    tracing::info!(swept, "Inactive sessions swept");
                }
            }
        })
    }

    pub async fn stats(&self) -> RegistryStats {
        RegistryStats {
            active: self.len().await,
            total_connected: self.total_connected.load(Ordering::Relaxed),
            total_removed: self.total_removed.load(Ordering::Relaxed),
            total_swept: self.total_swept.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_register_assigns_unique_ids() {
        let registry = SessionRegistry::new();
        let a = registry.register("1.1.1.1", "ua", ClientKind::Web).await;
        let b = registry.register("2.2.2.2", "ua", ClientKind::Tv).await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.get(b).await.unwrap().client, ClientKind::Tv);
    }

    #[tokio::test]
    async fn test_user_agent_is_truncated() {
        let registry = SessionRegistry::new();
        let long = "x".repeat(250);
        let id = registry.register("", &long, ClientKind::Web).await;
        assert_eq!(
            registry.get(id).await.unwrap().user_agent_prefix.len(),
            USER_AGENT_PREFIX_LEN
        );
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        let id = registry.register("", "", ClientKind::Web).await;

        assert!(registry.remove(id).await);
        assert!(!registry.remove(id).await);
        assert!(!registry.touch(id).await);

        let stats = registry.stats().await;
        assert_eq!(stats.active, 0);
        assert_eq!(stats.total_connected, 1);
        assert_eq!(stats.total_removed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_idle_sessions() {
        let registry = SessionRegistry::new();
        let idle = registry.register("", "", ClientKind::Web).await;
        let busy = registry.register("", "", ClientKind::Web).await;

        tokio::time::advance(Duration::from_secs(200)).await;
        registry.touch(busy).await;
        tokio::time::advance(Duration::from_secs(200)).await;

        assert_eq!(registry.sweep(Duration::from_secs(300)).await, 1);
        assert!(registry.get(idle).await.is_none());
        assert!(registry.get(busy).await.is_some());
        assert!(!registry.remove(idle).await);
        assert_eq!(registry.stats().await.total_swept, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_runs_periodically() {
        let registry = Arc::new(SessionRegistry::new());
        registry.register("", "", ClientKind::Web).await;

        let handle = registry.spawn_sweeper(Duration::from_secs(60), Duration::from_secs(300));
        tokio::time::sleep(Duration::from_secs(400)).await;

        assert!(registry.is_empty().await);
        handle.abort();
    }
}

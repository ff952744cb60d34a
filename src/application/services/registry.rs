//! Session registry - Directory of connected sessions keyed by username

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::application::errors::ChatError;
use crate::domain::entities::{Session, DEFAULT_WRITE_TIMEOUT};

/// Default bound on a single sink write during delivery
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = DEFAULT_WRITE_TIMEOUT;

/// Result of a broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<String>,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

/// Shared directory of connected sessions.
///
/// Every operation takes the lock for its own duration only. Delivery never
/// happens under the lock: targets are snapshotted first, then written to.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    delivery_timeout: Duration,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_delivery_timeout(DEFAULT_DELIVERY_TIMEOUT)
    }

    pub fn with_delivery_timeout(delivery_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            delivery_timeout,
        }
    }

    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    /// Register a session under its username
    pub async fn join(&self, session: Arc<Session>) -> Result<(), ChatError> {
        let mut sessions = self.sessions.write().await;
        match sessions.entry(session.username().to_string()) {
            Entry::Occupied(entry) => Err(ChatError::DuplicateUser(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!("Registered {}", session);
                entry.insert(session);
                Ok(())
            }
        }
    }

    /// Remove a username. Removing an absent username is a no-op.
    pub async fn leave(&self, username: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.write().await.remove(username);
        if removed.is_none() {
            tracing::debug!("Client[{}] already left", username);
        }
        removed
    }

    /// Remove `session` only if it is the one registered under its username.
    ///
    /// A rejected or stale session must not evict a newer session that owns
    /// the same name.
    pub async fn leave_session(&self, session: &Session) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        match sessions.entry(session.username().to_string()) {
            Entry::Occupied(entry) if entry.get().id() == session.id() => Some(entry.remove()),
            _ => {
                tracing::debug!("{} is not registered", session);
                None
            }
        }
    }

    pub async fn lookup(&self, username: &str) -> Result<Arc<Session>, ChatError> {
        self.sessions
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| ChatError::UserNotFound(username.to_string()))
    }

    pub async fn contains(&self, username: &str) -> bool {
        self.sessions.read().await.contains_key(username)
    }

    /// Registered usernames, sorted
    pub async fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sessions registered right now, minus `excluded`
    async fn snapshot_except(&self, excluded: Option<&str>) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != excluded)
            .map(|(_, session)| session.clone())
            .collect()
    }

    /// Write one line to a single session within the delivery bound
    pub async fn deliver(&self, target: &Session, line: &str) -> Result<(), ChatError> {
        match timeout(self.delivery_timeout, target.try_notify(line)).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::SinkUnavailable(format!(
                "{} did not accept output within {:?}",
                target, self.delivery_timeout
            ))),
        }
    }

    /// Deliver `line` (followed by a fresh prompt) to every registered
    /// session except `excluded`.
    ///
    /// Each live entry is visited exactly once. Sinks are written to
    /// concurrently; one that fails or exceeds the delivery bound is logged
    /// and reported but never holds up the others.
    pub async fn broadcast_except(&self, excluded: Option<&str>, line: &str) -> BroadcastReport {
        let targets = self.snapshot_except(excluded).await;
        let mut report = BroadcastReport::default();
        if targets.is_empty() {
            return report;
        }

        let line: Arc<str> = Arc::from(line);
        let bound = self.delivery_timeout;
        let mut deliveries = JoinSet::new();
        for session in targets {
            let line = line.clone();
            deliveries.spawn(async move {
                let result = match timeout(bound, session.announce(&line)).await {
                    Ok(result) => result,
                    Err(_) => Err(ChatError::SinkUnavailable(format!(
                        "timed out after {:?}",
                        bound
                    ))),
                };
                (session.username().to_string(), result)
            });
        }

        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.delivered += 1,
                Ok((username, Err(e))) => {
                    tracing::warn!("[{}] Broadcast skipped: {}", username, e);
                    report.failed.push(username);
                }
                Err(e) => {
                    tracing::error!("Broadcast task failed: {}", e);
                    report.failed.push(String::from("<unknown>"));
                }
            }
        }

        report
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

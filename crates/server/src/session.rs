//! Session Management
//!
//! One `Session` per browser conversation. Sessions live in memory only and
//! are dropped on idle timeout, explicit delete, or shutdown.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

use textbook_chat_agent::ChatSession;

use crate::ServerError;

/// Session state
pub struct Session {
    pub id: String,
    pub last_activity: RwLock<Instant>,
    /// Held for the whole turn, so a session processes one question at a time
    pub chat: Mutex<ChatSession>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            chat: Mutex::new(ChatSession::new(id.clone())),
            id,
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self::with_config(
            max_sessions,
            Duration::from_secs(3600),
            Duration::from_secs(60),
        )
    }

    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Start a background task that drops idle sessions every
    /// `cleanup_interval`. Send `true` on the returned channel to stop it.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = manager.count(),
                                "Session cleanup"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a new session with a fresh, empty transcript
    pub fn create(&self) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);

            if sessions.len() >= self.max_sessions {
                return Err(ServerError::SessionLimit(self.max_sessions));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(&id));
        sessions.insert(id.clone(), session.clone());

        tracing::info!(session_id = %id, "Created session");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Removed session");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop idle sessions, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) -> usize {
        let timeout = self.session_timeout;
        let before = sessions.len();
        sessions.retain(|id, s| {
            let keep = !s.is_expired(timeout);
            if !keep {
                tracing::info!(session_id = %id, "Expired session");
            }
            keep
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let manager = SessionManager::new(10);
        let session = manager.create().unwrap();

        assert!(!session.is_expired(Duration::from_secs(60)));
        assert_eq!(manager.count(), 1);
    }

    #[tokio::test]
    async fn test_new_session_has_empty_transcript() {
        let manager = SessionManager::new(10);
        let session = manager.create().unwrap();

        let chat = session.chat.lock().await;
        assert_eq!(chat.id(), session.id);
        assert!(chat.transcript().is_empty());
    }

    #[test]
    fn test_session_get_and_remove() {
        let manager = SessionManager::new(10);
        let id = manager.create().unwrap().id.clone();

        assert_eq!(manager.get(&id).unwrap().id, id);
        assert!(manager.remove(&id));
        assert!(manager.get(&id).is_none());
        assert!(!manager.remove(&id));
    }

    #[test]
    fn test_capacity_limit() {
        let manager = SessionManager::new(2);
        manager.create().unwrap();
        manager.create().unwrap();

        assert!(matches!(
            manager.create(),
            Err(ServerError::SessionLimit(2))
        ));
    }

    #[test]
    fn test_expired_sessions_make_room() {
        let manager =
            SessionManager::with_config(1, Duration::from_millis(0), Duration::from_secs(60));
        let first = manager.create().unwrap().id.clone();
        std::thread::sleep(Duration::from_millis(5));

        let second = manager.create().unwrap().id.clone();
        assert!(manager.get(&first).is_none());
        assert!(manager.get(&second).is_some());
    }

    #[test]
    fn test_cleanup_expired() {
        let manager =
            SessionManager::with_config(10, Duration::from_millis(0), Duration::from_secs(60));
        manager.create().unwrap();
        manager.create().unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(manager.cleanup_expired(), 2);
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_signal() {
        let manager = Arc::new(SessionManager::with_config(
            10,
            Duration::from_secs(3600),
            Duration::from_millis(10),
        ));
        let shutdown = manager.start_cleanup_task();
        manager.create().unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(manager.count(), 1);
        shutdown.send(true).unwrap();
    }
}

//! Lifecycle management for in-flight generations.
//!
//! Tracks active generations, enforces the concurrency limit, and cancels a
//! generation when its request goes away (including client disconnects).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Which handler a generation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Blocking,
    Streaming,
}

/// Tracks active generations and controls concurrency.
pub struct SessionManager {
    active: Mutex<HashMap<Uuid, GenerationKind>>,
    concurrency_limit: Arc<Semaphore>,
    max_concurrent: usize,
}

/// Releases the generation slot when dropped.
///
/// When the HTTP connection drops, axum drops the handler future or the
/// response stream that owns this guard; the drop cancels the token so the
/// model stops at its next token.
pub struct SessionGuard {
    session_id: Uuid,
    cancel: CancellationToken,
    manager: Arc<SessionManager>,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// A clone of the cancellation token to check in generation loops.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.manager.remove_session(self.session_id);
    }
}

impl SessionManager {
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(HashMap::new()),
            concurrency_limit: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    /// Take a generation slot without waiting. `None` if at capacity.
    pub fn try_acquire(self: &Arc<Self>, kind: GenerationKind) -> Option<SessionGuard> {
        let permit = Arc::clone(&self.concurrency_limit).try_acquire_owned().ok()?;

        let session_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        self.lock_active().insert(session_id, kind);
        tracing::debug!(session = %session_id, ?kind, "generation slot acquired");

        Some(SessionGuard {
            session_id,
            cancel,
            manager: Arc::clone(self),
            _permit: permit,
        })
    }

    fn remove_session(&self, session_id: Uuid) {
        self.lock_active().remove(&session_id);
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, GenerationKind>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn active_count(&self) -> usize {
        self.lock_active().len()
    }

    pub fn streaming_count(&self) -> usize {
        self.lock_active()
            .values()
            .filter(|&&kind| kind == GenerationKind::Streaming)
            .count()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn available_permits(&self) -> usize {
        self.concurrency_limit.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release() {
        let manager = SessionManager::new(2);
        let guard = manager.try_acquire(GenerationKind::Blocking).unwrap();
        assert_eq!(manager.active_count(), 1);
        assert_eq!(manager.available_permits(), 1);
        drop(guard);
        assert_eq!(manager.active_count(), 0);
        assert_eq!(manager.available_permits(), 2);
    }

    #[test]
    fn at_capacity_returns_none() {
        let manager = SessionManager::new(1);
        let _held = manager.try_acquire(GenerationKind::Streaming).unwrap();
        assert!(manager.try_acquire(GenerationKind::Blocking).is_none());
        assert_eq!(manager.streaming_count(), 1);
    }

    #[test]
    fn drop_cancels_token() {
        let manager = SessionManager::new(1);
        let guard = manager.try_acquire(GenerationKind::Streaming).unwrap();
        let token = guard.cancellation_token();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }

    #[test]
    fn session_ids_are_unique() {
        let manager = SessionManager::new(2);
        let a = manager.try_acquire(GenerationKind::Blocking).unwrap();
        let b = manager.try_acquire(GenerationKind::Streaming).unwrap();
        assert_ne!(a.session_id(), b.session_id());
        assert_eq!(manager.active_count(), 2);
    }
}

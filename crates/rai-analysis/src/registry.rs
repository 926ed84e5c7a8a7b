//! Single-flight bookkeeping: at most one analysis or re-analysis per
//! session at a time within a process.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use rai_core::SessionId;

/// Sessions with an active run. Cloning shares the same set.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    active: Arc<Mutex<HashSet<SessionId>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the run slot for `session_id`, or `None` if it is taken.
    pub fn try_acquire(&self, session_id: SessionId) -> Option<RunGuard> {
        if self.active.lock().insert(session_id) {
            Some(RunGuard {
                registry: self.clone(),
                session_id,
            })
        } else {
            None
        }
    }

    pub fn is_running(&self, session_id: SessionId) -> bool {
        self.active.lock().contains(&session_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

/// Releases the run slot when dropped.
#[derive(Debug)]
pub struct RunGuard {
    registry: RunRegistry,
    session_id: SessionId,
}

impl RunGuard {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.active.lock().remove(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let registry = RunRegistry::new();
        let id = SessionId::new();
        let guard = registry.try_acquire(id).expect("first acquire");
        assert!(registry.try_acquire(id).is_none());
        assert!(registry.is_running(id));
        drop(guard);
        assert!(!registry.is_running(id));
        assert!(registry.try_acquire(id).is_some());
    }

    #[test]
    fn sessions_are_independent() {
        let registry = RunRegistry::new();
        let _a = registry.try_acquire(SessionId::new()).unwrap();
        let _b = registry.try_acquire(SessionId::new()).unwrap();
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn clones_share_state() {
        let registry = RunRegistry::new();
        let id = SessionId::new();
        let _guard = registry.clone().try_acquire(id).unwrap();
        assert!(registry.is_running(id));
    }
}

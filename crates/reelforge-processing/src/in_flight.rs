//! Registry of artifacts currently inside `process`
//!
//! Shared by the fire-and-forget queue and the background sweep so the same
//! artifact is never processed twice concurrently.

use std::sync::Arc;

use dashmap::DashSet;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InFlightSet {
    ids: Arc<DashSet<Uuid>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`. Returns `None` if it is already claimed.
    pub fn try_acquire(&self, id: Uuid) -> Option<InFlightGuard> {
        if self.ids.insert(id) {
            Some(InFlightGuard {
                ids: Arc::clone(&self.ids),
                id,
            })
        } else {
            None
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Releases the claim on drop.
pub struct InFlightGuard {
    ids: Arc<DashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_and_released_on_drop() {
        let set = InFlightSet::new();
        let id = Uuid::new_v4();

        let guard = set.try_acquire(id).unwrap();
        assert!(set.contains(&id));
        assert!(set.try_acquire(id).is_none());
        assert!(set.try_acquire(Uuid::new_v4()).is_some());

        drop(guard);
        assert!(!set.contains(&id));
        assert!(set.try_acquire(id).is_some());
    }
}

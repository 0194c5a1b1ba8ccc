use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

/// The identity a session runs under, typically the host's channel id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(pub String);

/// Mutual exclusion for sessions: at most one per key. The host owns a
/// registry and acquires a slot before constructing a session; the slot
/// frees the key when dropped.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    active: Arc<Mutex<HashSet<SessionKey>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the key, or `None` if a session already holds it.
    pub fn try_acquire(&self, key: SessionKey) -> Option<SessionSlot> {
        let mut active = self.active.lock().unwrap();
        if !active.insert(key.clone()) {
            return None;
        }
        Some(SessionSlot {
            registry: self.clone(),
            key,
        })
    }

    /// Whether a session currently holds the key.
    pub fn is_active(&self, key: &SessionKey) -> bool {
        self.active.lock().unwrap().contains(key)
    }
}

/// An exclusive claim on a session key.
pub struct SessionSlot {
    registry: SessionRegistry,
    key: SessionKey,
}
impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.registry.active.lock().unwrap().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_key_is_rejected() {
        let registry = SessionRegistry::new();
        let key = SessionKey("channel-1".to_string());

        let slot = registry.try_acquire(key.clone());
        assert!(slot.is_some());
        assert!(registry.is_active(&key));
        assert!(registry.try_acquire(key.clone()).is_none());

        // Other keys are unaffected.
        assert!(registry
            .try_acquire(SessionKey("channel-2".to_string()))
            .is_some());
    }

    #[test]
    fn dropping_the_slot_frees_the_key() {
        let registry = SessionRegistry::new();
        let key = SessionKey("channel-1".to_string());

        let slot = registry.try_acquire(key.clone());
        drop(slot);
        assert!(!registry.is_active(&key));
        assert!(registry.try_acquire(key).is_some());
    }
}

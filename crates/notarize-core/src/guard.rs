//! Submission serialisation.
//!
//! The service rejects concurrent uploads that share a bundle identity, so
//! runs targeting the same bundle share one [`SubmissionGuard`]. The guard is
//! held only across the submit call; polling never takes it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Cloneable mutual-exclusion handle. Clones share the same lock.
#[derive(Debug, Clone, Default)]
pub struct SubmissionGuard {
    lock: Arc<AsyncMutex<()>>,
}

/// Held while a submit call runs. Released on drop.
#[derive(Debug)]
pub struct SubmissionPermit {
    _held: OwnedMutexGuard<()>,
}

impl SubmissionGuard {
    /// A fresh, uncontended guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder of this guard is submitting.
    pub async fn acquire(&self) -> SubmissionPermit {
        SubmissionPermit {
            _held: Arc::clone(&self.lock).lock_owned().await,
        }
    }

    /// Whether a submit is in flight under this guard right now.
    pub fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Whether two handles refer to the same lock.
    pub fn same_as(&self, other: &SubmissionGuard) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

/// Hands out one shared guard per bundle identity.
#[derive(Debug, Default)]
pub struct GuardRegistry {
    guards: Mutex<HashMap<String, SubmissionGuard>>,
}

impl GuardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The guard for `bundle_id`, created on first use.
    pub fn guard_for(&self, bundle_id: &str) -> SubmissionGuard {
        let mut guards = self.guards.lock().unwrap_or_else(|e| e.into_inner());
        guards.entry(bundle_id.to_string()).or_default().clone()
    }

    /// Number of distinct bundle identities seen so far.
    pub fn len(&self) -> usize {
        self.guards.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permit_releases_on_drop() {
        let guard = SubmissionGuard::new();
        let permit = guard.acquire().await;
        assert!(guard.is_held());
        drop(permit);
        assert!(!guard.is_held());
    }

    #[tokio::test]
    async fn test_clones_share_the_lock() {
        let guard = SubmissionGuard::new();
        let other = guard.clone();
        let _permit = guard.acquire().await;
        assert!(other.is_held());
        assert!(!SubmissionGuard::new().is_held());
    }

    #[test]
    fn test_registry_shares_per_bundle() {
        let registry = GuardRegistry::new();
        let a1 = registry.guard_for("com.example.app");
        let a2 = registry.guard_for("com.example.app");
        let b = registry.guard_for("com.example.other");

        assert!(a1.same_as(&a2));
        assert!(!a1.same_as(&b));
        assert_eq!(registry.len(), 2);
    }
}

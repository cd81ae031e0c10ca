//! Resolved-role cache shared by the dashboard router and the auth handlers.
//!
//! Keyed by identity id. Entries are dropped on sign-out, whenever a role is
//! stamped onto the identity, and once they are older than the TTL. A role
//! changed at the provider is therefore picked up within one TTL window.
//! Expired entries are swept when the map grows past [`SWEEP_THRESHOLD`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::role::Role;

/// Default lifetime of a cached role.
pub const DEFAULT_ROLE_TTL: Duration = Duration::from_secs(5 * 60);

/// Map size above which `remember` sweeps expired entries.
pub const SWEEP_THRESHOLD: usize = 1024;

#[derive(Clone, Copy)]
struct CachedRole {
    role: Role,
    stored_at: Instant,
}

#[derive(Clone)]
pub struct RoleCache {
    inner: Arc<RwLock<HashMap<String, CachedRole>>>,
    ttl: Duration,
}

impl Default for RoleCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_ROLE_TTL)
    }
}

impl RoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Cached role, unless the entry has outlived the TTL.
    pub fn get(&self, identity_id: &str) -> Option<Role> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity_id)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.role)
    }

    pub fn remember(&self, identity_id: &str, role: Role) {
        let mut entries = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= SWEEP_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        }
        entries.insert(
            identity_id.to_string(),
            CachedRole {
                role,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for an identity. Returns the role that was cached.
    pub fn invalidate(&self, identity_id: &str) -> Option<Role> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity_id)
            .map(|entry| entry.role)
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_then_get() {
        let cache = RoleCache::new();
        assert_eq!(cache.get("u1"), None);
        cache.remember("u1", Role::Clinic);
        assert_eq!(cache.get("u1"), Some(Role::Clinic));
    }

    #[test]
    fn invalidate_removes_only_that_identity() {
        let cache = RoleCache::new();
        cache.remember("u1", Role::Doctor);
        cache.remember("u2", Role::Patient);

        assert_eq!(cache.invalidate("u1"), Some(Role::Doctor));
        assert_eq!(cache.get("u1"), None);
        assert_eq!(cache.get("u2"), Some(Role::Patient));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clones_share_entries() {
        let cache = RoleCache::new();
        let handle = cache.clone();
        handle.remember("u1", Role::Patient);
        assert_eq!(cache.get("u1"), Some(Role::Patient));
    }

    #[test]
    fn expired_entries_are_not_served() {
        let cache = RoleCache::with_ttl(Duration::ZERO);
        cache.remember("u1", Role::Doctor);
        assert_eq!(cache.get("u1"), None);
    }

    #[test]
    fn sweep_drops_expired_entries_past_threshold() {
        let cache = RoleCache::with_ttl(Duration::ZERO);
        for i in 0..SWEEP_THRESHOLD {
            cache.remember(&format!("u{i}"), Role::Patient);
        }
        assert_eq!(cache.len(), SWEEP_THRESHOLD);

        cache.remember("fresh", Role::Clinic);
        assert_eq!(cache.len(), 1);
    }
}

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, Weak},
};

use crate::{Invalidation, InvalidationBus, PermissionMatrix, ProfileId, Stamp, Subject, UserId};

#[derive(Debug)]
struct CachedMatrix {
    stamp: Stamp,
    profile: Option<ProfileId>,
    matrix: Arc<PermissionMatrix>,
}

type Entries = RwLock<HashMap<UserId, CachedMatrix>>;

/// Per-user cache of effective permission matrices.
///
/// Entries are validated against the [InvalidationBus] on every read, so a published invalidation
/// makes the affected entries unreachable immediately. The cache also subscribes to the bus and
/// evicts those entries, so users who never come back do not keep a matrix alive.
#[derive(Debug)]
pub struct MatrixCache {
    bus: Arc<InvalidationBus>,
    entries: Arc<Entries>,
}

impl MatrixCache {
    pub fn new(bus: Arc<InvalidationBus>) -> Self {
        let entries: Arc<Entries> = Arc::default();
        // The bus outlives a dropped cache; the listener then finds nothing to evict.
        let weak: Weak<Entries> = Arc::downgrade(&entries);
        bus.subscribe(move |event| {
            if let Some(entries) = weak.upgrade() {
                evict(&entries, event);
            }
        });
        MatrixCache { bus, entries }
    }

    /// Fresh cached matrix for the subject, if any.
    pub fn get(&self, subject: &impl Subject) -> Option<Arc<PermissionMatrix>> {
        let stamp = self.bus.stamp(subject);
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&subject.id())
            .filter(|cached| cached.stamp == stamp)
            .map(|cached| Arc::clone(&cached.matrix))
    }

    /// Returns the cached matrix or computes and stores a new one.
    pub fn get_or_insert_with(
        &self,
        subject: &impl Subject,
        compute: impl FnOnce() -> PermissionMatrix,
    ) -> Arc<PermissionMatrix> {
        // Stamp before computing: a write racing the computation leaves the entry stale, not fresh.
        let stamp = self.bus.stamp(subject);
        if let Some(cached) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&subject.id())
            .filter(|cached| cached.stamp == stamp)
        {
            return Arc::clone(&cached.matrix);
        }

        let matrix = Arc::new(compute());
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                subject.id(),
                CachedMatrix {
                    stamp,
                    profile: subject.profile_id(),
                    matrix: Arc::clone(&matrix),
                },
            );
        matrix
    }

    /// Drops the entry of one user.
    pub fn invalidate(&self, user: UserId) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user);
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict(entries: &Entries, event: &Invalidation) {
    let mut entries = entries.write().unwrap_or_else(PoisonError::into_inner);
    match *event {
        Invalidation::User(user) => {
            entries.remove(&user);
        }
        Invalidation::Profile(profile) => {
            entries.retain(|_, cached| cached.profile != Some(profile));
        }
        Invalidation::All => entries.clear(),
    }
}

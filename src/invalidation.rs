//! Explicit invalidation events for anything caching resolver output.
//!
//! Every write to profile defaults or override rows is followed by an [Invalidation] published
//! on an [InvalidationBus]. The bus keeps monotonic version counters (global, per user, per
//! profile) and calls its subscribers synchronously, so once [InvalidationBus::publish] returns no
//! cache can serve an entry computed before the write.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{ProfileId, Subject, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invalidation {
    /// Override rows of one user changed.
    User(UserId),
    /// Default permissions of a profile changed; affects every user assigned to it.
    Profile(ProfileId),
    /// Anything may have changed (module activation, full reload).
    All,
}

/// Versions observed for one subject. Two stamps differ iff an invalidation relevant to that
/// subject happened in between, or the subject's own record changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stamp {
    epoch: u64,
    user: u64,
    profile: u64,
    admin: bool,
    active: bool,
    profile_id: Option<ProfileId>,
}

type Listener = Arc<dyn Fn(&Invalidation) + Send + Sync>;

#[derive(Default)]
pub struct InvalidationBus {
    epoch: AtomicU64,
    users: RwLock<HashMap<UserId, u64>>,
    profiles: RwLock<HashMap<ProfileId, u64>>,
    listeners: RwLock<Vec<Listener>>,
}

impl fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("epoch", &self.epoch())
            .field(
                "listeners",
                &self.listeners.read().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .finish()
    }
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback run synchronously on every published event.
    pub fn subscribe(&self, listener: impl Fn(&Invalidation) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Bumps the relevant version counter, then notifies subscribers.
    pub fn publish(&self, event: Invalidation) {
        match event {
            Invalidation::User(user) => {
                *self
                    .users
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(user)
                    .or_default() += 1;
            }
            Invalidation::Profile(profile) => {
                *self
                    .profiles
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(profile)
                    .or_default() += 1;
            }
            Invalidation::All => {
                self.epoch.fetch_add(1, Ordering::AcqRel);
            }
        }
        tracing::debug!(?event, "permission invalidation published");

        // Callbacks run without the lock held, so they may subscribe or publish themselves.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn user_version(&self, user: UserId) -> u64 {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .copied()
            .unwrap_or(0)
    }

    pub fn profile_version(&self, profile: ProfileId) -> u64 {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&profile)
            .copied()
            .unwrap_or(0)
    }

    /// Current versions for a subject.
    pub fn stamp(&self, subject: &impl Subject) -> Stamp {
        let profile_id = subject.profile_id();
        Stamp {
            epoch: self.epoch(),
            user: self.user_version(subject.id()),
            profile: profile_id.map_or(0, |id| self.profile_version(id)),
            admin: subject.is_admin(),
            active: subject.is_active(),
            profile_id,
        }
    }
}

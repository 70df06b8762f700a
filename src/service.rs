use std::{collections::BTreeSet, sync::Arc};

use arc_swap::ArcSwap;

use crate::{
    Action, AuthzConfig, Decision, Invalidation, InvalidationBus, MatrixCache, Module,
    ModuleCatalog, ModuleCode, ModuleRegistry, Override, OverrideTable, PermissionDenied,
    PermissionMatrix, PermissionResolver, Profile, ProfileCatalog, ProfileId, ProfileReferences,
    RegistryError, RouteMap, Subject, Trace, UserId,
};

/// Consistent state of the three permission stores. Resolutions always run against a single
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    modules: ModuleCatalog,
    profiles: ProfileCatalog,
    overrides: OverrideTable,
}

impl Snapshot {
    pub fn resolver(&self) -> PermissionResolver<'_, ModuleCatalog, ProfileCatalog, OverrideTable> {
        PermissionResolver::new(&self.modules, &self.profiles, &self.overrides)
    }

    pub fn modules(&self) -> &ModuleCatalog {
        &self.modules
    }

    pub fn profiles(&self) -> &ProfileCatalog {
        &self.profiles
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    fn add_profile(&mut self, profile: Profile) -> Result<Option<Profile>, RegistryError> {
        if let Some(module) = profile
            .default_permissions
            .keys()
            .find(|code| !self.modules.contains(**code))
        {
            return Err(RegistryError::ModuleNotProvisioned(*module));
        }
        self.profiles.upsert(profile)
    }

    fn add_override(&mut self, row: Override) -> Result<Option<Override>, RegistryError> {
        if !self.modules.contains(row.module) {
            return Err(RegistryError::ModuleNotProvisioned(row.module));
        }
        Ok(self.overrides.upsert(row))
    }
}

/// PermissionService - answers "may this user perform this action on this module" via
/// [.resolve()][PermissionService#method.resolve] and [.check()][PermissionService#method.check].
///
/// Reads never lock: they load the current [Snapshot]. Edits go through an updater which swaps a
/// new snapshot in atomically and then publishes invalidations on the service's [InvalidationBus].
#[derive(Debug)]
pub struct PermissionService {
    snapshot: ArcSwap<Snapshot>,
    bus: Arc<InvalidationBus>,
    cache: MatrixCache,
}

/// PermissionServiceBuilder - used when you create the permission service.
pub struct PermissionServiceBuilder {
    snapshot: Snapshot,
    bus: Option<Arc<InvalidationBus>>,
}

impl PermissionServiceBuilder {
    pub fn build(&self) -> PermissionService {
        let bus = self.bus.clone().unwrap_or_default();
        PermissionService {
            snapshot: ArcSwap::new(Arc::new(self.snapshot.clone())),
            cache: MatrixCache::new(Arc::clone(&bus)),
            bus,
        }
    }

    pub fn add_module(&mut self, module: Module) -> &mut Self {
        self.snapshot.modules.insert(module);
        self
    }

    pub fn load_modules(&mut self, modules: Vec<Module>) -> &mut Self {
        self.snapshot.modules.load(modules);
        self
    }

    /// Provisions [Module::standard].
    pub fn standard_modules(&mut self) -> &mut Self {
        self.load_modules(Module::standard())
    }

    /// Adds a profile. Every module it configures must already be provisioned.
    pub fn add_profile(&mut self, profile: Profile) -> Result<&mut Self, RegistryError> {
        self.snapshot.add_profile(profile)?;
        Ok(self)
    }

    pub fn load_profiles(&mut self, profiles: Vec<Profile>) -> Result<&mut Self, RegistryError> {
        for profile in profiles {
            self.add_profile(profile)?;
        }
        Ok(self)
    }

    pub fn add_override(&mut self, row: Override) -> Result<&mut Self, RegistryError> {
        self.snapshot.add_override(row)?;
        Ok(self)
    }

    /// Seeds modules, then profiles, then overrides from a config.
    pub fn load_config(&mut self, config: AuthzConfig) -> Result<&mut Self, RegistryError> {
        self.load_modules(config.modules);
        self.load_profiles(config.profiles)?;
        for row in config.overrides {
            self.add_override(row)?;
        }
        Ok(self)
    }

    /// Shares an existing bus, e.g. one other caches already subscribe to.
    pub fn with_bus(&mut self, bus: Arc<InvalidationBus>) -> &mut Self {
        self.bus = Some(bus);
        self
    }
}

/// Collects edits against a private copy of the state. Nothing is visible to readers until
/// [.update()][PermissionServiceUpdater#method.update] is called.
pub struct PermissionServiceUpdater {
    snapshot: Snapshot,
    full_reload: bool,
    modules_changed: bool,
    users: BTreeSet<UserId>,
    profiles: BTreeSet<ProfileId>,
}

impl PermissionServiceUpdater {
    fn new(snapshot: Snapshot, full_reload: bool) -> Self {
        PermissionServiceUpdater {
            snapshot,
            full_reload,
            modules_changed: false,
            users: BTreeSet::new(),
            profiles: BTreeSet::new(),
        }
    }

    /// Adds or replaces one module.
    pub fn add_module(&mut self, module: Module) -> &mut Self {
        self.snapshot.modules.insert(module);
        self.modules_changed = true;
        self
    }

    pub fn load_modules(&mut self, modules: Vec<Module>) -> &mut Self {
        for module in modules {
            self.add_module(module);
        }
        self
    }

    pub fn set_module_active(
        &mut self,
        code: ModuleCode,
        active: bool,
    ) -> Result<&mut Self, RegistryError> {
        self.snapshot.modules.set_active(code, active)?;
        self.modules_changed = true;
        Ok(self)
    }

    /// Creates or replaces a profile's record, default map included.
    pub fn upsert_profile(&mut self, profile: Profile) -> Result<&mut Self, RegistryError> {
        let id = profile.id;
        self.snapshot.add_profile(profile)?;
        self.profiles.insert(id);
        Ok(self)
    }

    /// Deletes a profile. Rejected while `references` reports users still assigned to it.
    pub fn remove_profile(
        &mut self,
        id: ProfileId,
        references: &(impl ProfileReferences + ?Sized),
    ) -> Result<Profile, RegistryError> {
        let removed = self.snapshot.profiles.remove(id, references)?;
        self.profiles.insert(id);
        Ok(removed)
    }

    /// Writes one override row. An all-inherit row deletes the stored one.
    pub fn set_override(&mut self, row: Override) -> Result<&mut Self, RegistryError> {
        let user = row.user;
        self.snapshot.add_override(row)?;
        self.users.insert(user);
        Ok(self)
    }

    pub fn remove_override(&mut self, user: UserId, module: ModuleCode) -> Option<Override> {
        self.users.insert(user);
        self.snapshot.overrides.remove(user, module)
    }

    /// Removes every override of a user so that their profile applies again.
    pub fn clear_overrides(&mut self, user: UserId) -> usize {
        self.users.insert(user);
        self.snapshot.overrides.clear_user(user)
    }

    /// Loads a whole config on top of the updater's state.
    pub fn load_config(&mut self, config: AuthzConfig) -> Result<&mut Self, RegistryError> {
        self.load_modules(config.modules);
        for profile in config.profiles {
            self.upsert_profile(profile)?;
        }
        for row in config.overrides {
            self.set_override(row)?;
        }
        Ok(self)
    }

    /// Swaps the edited state into the service (atomically), then publishes invalidations for
    /// everything touched.
    pub fn update(self, service: &PermissionService) {
        service.snapshot.store(Arc::new(self.snapshot));
        tracing::debug!(
            full_reload = self.full_reload,
            modules_changed = self.modules_changed,
            users = self.users.len(),
            profiles = self.profiles.len(),
            "permission snapshot swapped"
        );

        if self.full_reload || self.modules_changed {
            service.bus.publish(Invalidation::All);
            return;
        }
        for profile in self.profiles {
            service.bus.publish(Invalidation::Profile(profile));
        }
        for user in self.users {
            service.bus.publish(Invalidation::User(user));
        }
    }
}

impl PermissionService {
    /// Creates builder ([PermissionServiceBuilder]) for [PermissionService]
    pub fn builder() -> PermissionServiceBuilder {
        PermissionServiceBuilder {
            snapshot: Snapshot::default(),
            bus: None,
        }
    }

    /// Builds a service straight from a config.
    pub fn from_config(config: AuthzConfig) -> Result<Self, RegistryError> {
        Ok(Self::builder().load_config(config)?.build())
    }

    /// Creates clean updater ([PermissionServiceUpdater]) replacing the whole state, e.g. when
    /// reloading from storage. Publishes [Invalidation::All] on update.
    pub fn updater_clean(&self) -> PermissionServiceUpdater {
        PermissionServiceUpdater::new(Snapshot::default(), true)
    }

    /// Creates updater ([PermissionServiceUpdater]) holding a copy of the current state, for small
    /// edits. Only the users and profiles touched are invalidated on update.
    ///
    /// Two updaters copied concurrently do not merge: the one updating last wins.
    pub fn updater_copy(&self) -> PermissionServiceUpdater {
        PermissionServiceUpdater::new(self.snapshot.load().as_ref().clone(), false)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    pub fn bus(&self) -> &Arc<InvalidationBus> {
        &self.bus
    }

    pub fn resolve(&self, subject: &impl Subject, module: ModuleCode, action: Action) -> Decision {
        self.snapshot.load().resolver().resolve(subject, module, action)
    }

    /// See [PermissionResolver::resolve_named]; panics on an unknown action code.
    pub fn resolve_named(&self, subject: &impl Subject, module: &str, action: &str) -> Decision {
        self.snapshot.load().resolver().resolve_named(subject, module, action)
    }

    /// Check if subject may perform the action. The error is identical whatever rule denied it.
    pub fn check(
        &self,
        subject: &impl Subject,
        module: ModuleCode,
        action: Action,
    ) -> Result<(), PermissionDenied> {
        match self.resolve(subject, module, action) {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(PermissionDenied { module, action }),
        }
    }

    /// Verbose resolution naming the deciding rule. For administrative debugging only.
    pub fn explain(&self, subject: &impl Subject, module: ModuleCode, action: Action) -> Trace {
        self.snapshot.load().resolver().explain(subject, module, action)
    }

    /// Resolves an HTTP request: the path selects the module, the method the action. Paths outside
    /// every module are denied.
    pub fn resolve_request(
        &self,
        routes: &RouteMap,
        subject: &impl Subject,
        method: &str,
        path: &str,
    ) -> Decision {
        match routes.module_for_path(path) {
            Some(module) => self.resolve(subject, module, Action::for_http_method(method)),
            None => Decision::Deny,
        }
    }

    /// Effective permission matrix, served from the cache while no relevant invalidation was
    /// published.
    pub fn effective_permissions(&self, subject: &impl Subject) -> Arc<PermissionMatrix> {
        self.cache.get_or_insert_with(subject, || {
            self.snapshot.load().resolver().effective_permissions(subject)
        })
    }

    /// Active modules in display order.
    pub fn active_modules(&self) -> Vec<Module> {
        self.snapshot
            .load()
            .modules
            .active_modules()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }
}

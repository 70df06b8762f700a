use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Action, ActionPermissions, Decision, ModuleCode, ModuleRegistry, OverrideStore, Profile,
    ProfileRegistry, Subject,
};

/// Rule of the resolution order that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    InactiveUser,
    /// Module is inactive or not provisioned.
    InactiveModule,
    AdminBypass,
    UserOverride,
    ProfileDefault,
    HardDefault,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::InactiveUser => "inactive user",
            Self::InactiveModule => "inactive module",
            Self::AdminBypass => "admin bypass",
            Self::UserOverride => "user override",
            Self::ProfileDefault => "profile default",
            Self::HardDefault => "hard default",
        };
        f.write_str(name)
    }
}

/// Verbose outcome of one resolution. Meant for administrators debugging a configuration, never
/// for the user who was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub module: ModuleCode,
    pub action: Action,
    pub decision: Decision,
    pub rule: Rule,
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} on {} ({})", self.decision, self.action, self.module, self.rule)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub module: ModuleCode,
    pub permissions: ActionPermissions,
}

/// Effective permissions of one user over every active module, in display order.
///
/// Drives UI affordances only. An operation about to be executed is re-checked with
/// [PermissionResolver::resolve], since a held matrix may be stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMatrix {
    entries: Vec<MatrixEntry>,
}

impl PermissionMatrix {
    pub fn get(&self, module: ModuleCode) -> Option<&ActionPermissions> {
        self.entries
            .iter()
            .find(|entry| entry.module == module)
            .map(|entry| &entry.permissions)
    }

    /// `false` for modules missing from the matrix, which are exactly the ones the resolver denies.
    pub fn allows(&self, module: ModuleCode, action: Action) -> bool {
        self.get(module).is_some_and(|perms| perms.get(action))
    }

    pub fn modules(&self) -> impl Iterator<Item = ModuleCode> + '_ {
        self.entries.iter().map(|entry| entry.module)
    }

    /// Modules the user may at least view; what a navigation menu shows.
    pub fn visible_modules(&self) -> impl Iterator<Item = ModuleCode> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.permissions.view)
            .map(|entry| entry.module)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatrixEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stateless resolver over three read-only stores.
///
/// Holds only shared references, so it is `Copy` and can be built per request or shared between
/// threads whenever the stores are `Sync`.
pub struct PermissionResolver<'a, M: ?Sized, P: ?Sized, O: ?Sized> {
    modules: &'a M,
    profiles: &'a P,
    overrides: &'a O,
}

impl<M: ?Sized, P: ?Sized, O: ?Sized> Clone for PermissionResolver<'_, M, P, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: ?Sized, P: ?Sized, O: ?Sized> Copy for PermissionResolver<'_, M, P, O> {}

impl<'a, M, P, O> PermissionResolver<'a, M, P, O>
where
    M: ModuleRegistry + ?Sized,
    P: ProfileRegistry + ?Sized,
    O: OverrideStore + ?Sized,
{
    pub fn new(modules: &'a M, profiles: &'a P, overrides: &'a O) -> Self {
        PermissionResolver {
            modules,
            profiles,
            overrides,
        }
    }

    /// Resolves and reports which rule decided. The first matching rule wins.
    pub fn explain(&self, subject: &impl Subject, module: ModuleCode, action: Action) -> Trace {
        self.explain_with(subject, self.profile_of(subject), module, action)
    }

    /// Looks up the subject's profile. A dangling reference is reported and treated as no profile.
    fn profile_of(&self, subject: &impl Subject) -> Option<&'a Profile> {
        let profile_id = subject.profile_id()?;
        let profile = self.profiles.profile(profile_id);
        if profile.is_none() {
            tracing::warn!(
                user = %subject.id(),
                profile = %profile_id,
                "user references a missing profile, treating as no profile"
            );
        }
        profile
    }

    fn explain_with(
        &self,
        subject: &impl Subject,
        profile: Option<&Profile>,
        module: ModuleCode,
        action: Action,
    ) -> Trace {
        let (decision, rule) = self.decide(subject, profile, module, action);
        tracing::trace!(
            user = %subject.id(),
            module = %module,
            action = %action,
            decision = %decision,
            rule = %rule,
            "permission resolved"
        );
        Trace {
            module,
            action,
            decision,
            rule,
        }
    }

    fn decide(
        &self,
        subject: &impl Subject,
        profile: Option<&Profile>,
        module: ModuleCode,
        action: Action,
    ) -> (Decision, Rule) {
        if !subject.is_active() {
            return (Decision::Deny, Rule::InactiveUser);
        }

        if !self.modules.module(module).is_some_and(|m| m.active) {
            return (Decision::Deny, Rule::InactiveModule);
        }

        if subject.is_admin() {
            return (Decision::Allow, Rule::AdminBypass);
        }

        if let Some(decision) = self
            .overrides
            .override_for(subject.id(), module)
            .and_then(|row| row.get(action).decision())
        {
            return (decision, Rule::UserOverride);
        }

        if let Some(defaults) = profile.and_then(|profile| profile.defaults_for(module)) {
            return (defaults.get(action).into(), Rule::ProfileDefault);
        }

        (action.hard_default(), Rule::HardDefault)
    }

    #[inline]
    pub fn resolve(&self, subject: &impl Subject, module: ModuleCode, action: Action) -> Decision {
        self.explain(subject, module, action).decision
    }

    /// String-typed entry point for callers holding raw codes.
    ///
    /// An unknown module code is denied like an inactive module.
    ///
    /// # Panics
    ///
    /// If `action` is not one of `view`, `create`, `edit`, `delete`, `approve`. That is an
    /// integration bug, not a business condition, and denying silently would hide it.
    pub fn resolve_named(&self, subject: &impl Subject, module: &str, action: &str) -> Decision {
        let action = Action::from_code(action)
            .unwrap_or_else(|| panic!("`{action}` is not a permission action"));
        match ModuleCode::from_code(module) {
            Some(module) => self.resolve(subject, module, action),
            None => {
                tracing::trace!(
                    user = %subject.id(),
                    module,
                    action = %action,
                    "unknown module denied"
                );
                Decision::Deny
            }
        }
    }

    /// Builds the full matrix by resolving every action of every active module. The profile is
    /// looked up once for the whole matrix.
    pub fn effective_permissions(&self, subject: &impl Subject) -> PermissionMatrix {
        let profile = self.profile_of(subject);
        let entries = self
            .modules
            .active_modules()
            .into_iter()
            .map(|module| MatrixEntry {
                module: module.code,
                permissions: ActionPermissions::from_fn(|action| {
                    self.explain_with(subject, profile, module.code, action)
                        .decision
                        .is_allowed()
                }),
            })
            .collect();
        PermissionMatrix { entries }
    }
}

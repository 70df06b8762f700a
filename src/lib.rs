//! Permission resolution core for a module-based business portal.
//!
//! The portal is split into independently activatable functional areas ([ModuleCode]): production,
//! quality, sales and administration. For every module a user may perform one of five [Action]s.
//! Whether they may do so is decided by combining four signals in a fixed order:
//!
//! 1. inactive users are denied everything;
//! 2. inactive (or unprovisioned) modules deny everything, admins included;
//! 3. admins are allowed everything else;
//! 4. a per-user [Override] row may explicitly allow or deny an action;
//! 5. otherwise the user's [Profile] default for the module applies;
//! 6. otherwise `view` is allowed and every other action is denied.
//!
//! Stores are plain read traits ([ModuleRegistry], [ProfileRegistry], [OverrideStore]) so any
//! storage can back them. [PermissionService] bundles in-memory versions behind an atomically
//! swapped snapshot and keeps a per-user [PermissionMatrix] cache that is invalidated through an
//! [InvalidationBus].
//!
//! Example usage:
//!```
//! use portal_authz::*;
//!
//! let salesperson = Profile::new(ProfileId(3), "Salesperson", 2).with_module(
//!     ModuleCode::Sales,
//!     ActionPermissions::from_actions(&[Action::View, Action::Create]),
//! );
//!
//! let mut builder = PermissionService::builder();
//! builder.standard_modules();
//! builder.add_profile(salesperson).unwrap();
//!
//! let service = builder.build();
//!
//! let user = User::new(UserId(10)).with_profile(ProfileId(3));
//! let admin = User::new(UserId(1)).admin();
//!
//! assert!(service.check(&user, ModuleCode::Sales, Action::Create).is_ok());
//! assert!(service.check(&user, ModuleCode::Sales, Action::Approve).is_err());
//! assert!(service.check(&admin, ModuleCode::Admin, Action::Delete).is_ok());
//!
//! // Grant one extra action to a single user. The updater swaps the new state in atomically
//! // and invalidates the user's cached matrix.
//! let mut updater = service.updater_copy();
//! updater
//!     .set_override(
//!         Override::new(UserId(10), ModuleCode::Sales)
//!             .with(Action::Approve, OverrideValue::Allow),
//!     )
//!     .unwrap();
//! updater.update(&service);
//!
//! assert!(service.resolve(&user, ModuleCode::Sales, Action::Approve).is_allowed());
//!
//! // Retiring a module denies it for everybody, admins included.
//! let mut updater = service.updater_copy();
//! updater.set_module_active(ModuleCode::Admin, false).unwrap();
//! updater.update(&service);
//!
//! assert!(service.resolve(&admin, ModuleCode::Admin, Action::View).is_denied());
//!```
use std::fmt;

mod cache;
mod config;
mod error;
#[cfg(test)]
mod example;
mod invalidation;
mod r#macro;
mod overrides;
mod registry;
mod resolver;
mod routes;
mod service;

use serde::{Deserialize, Serialize};

pub use cache::MatrixCache;
pub use config::AuthzConfig;
pub use error::{ParseCodeError, RegistryError};
pub use invalidation::{Invalidation, InvalidationBus, Stamp};
pub use overrides::{Override, OverrideStore, OverrideTable};
pub use registry::{
    Module, ModuleCatalog, ModuleRegistry, Profile, ProfileCatalog, ProfileReferences,
    ProfileRegistry, ProfileS,
};
pub use resolver::{MatrixEntry, PermissionMatrix, PermissionResolver, Rule, Trace};
pub use routes::RouteMap;
pub use service::{PermissionService, PermissionServiceBuilder, PermissionServiceUpdater, Snapshot};

#[doc(hidden)]
pub mod __private {
    pub use serde;
}

crate::define_codes! {
    /// Operation evaluated per module.
    pub enum Action {
        View = "view" => "See a module's screens and records",
        Create = "create" => "Create new records",
        Edit = "edit" => "Modify existing records",
        Delete = "delete" => "Delete records",
        Approve = "approve" => "Approve or sign off records",
    }
}

impl Action {
    /// Outcome applied when neither an override nor a profile entry exists.
    #[inline]
    pub fn hard_default(self) -> Decision {
        match self {
            Action::View => Decision::Allow,
            _ => Decision::Deny,
        }
    }
}

crate::define_codes! {
    /// Closed set of functional areas the portal is split into.
    pub enum ModuleCode {
        Production = "PRODUCTION" => "Production orders and activities",
        Quality = "QUALITY" => "Non-conformities, customer complaints and corrective actions",
        Sales = "SALES" => "CRM, proposals and sales management",
        Admin = "ADMIN" => "Users, profiles and system settings",
    }
}

/// Final answer of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    #[inline]
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    #[inline]
    pub fn is_denied(self) -> bool {
        self == Decision::Deny
    }
}

impl From<bool> for Decision {
    fn from(value: bool) -> Self {
        if value { Decision::Allow } else { Decision::Deny }
    }
}

impl From<Decision> for bool {
    fn from(value: Decision) -> Self {
        value.is_allowed()
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

/// Per-action choice stored in an [Override] row.
///
/// Stored as an optional boolean (`true`, `false` or absent), but never handled as one: `Inherit`
/// cannot be mistaken for an explicit deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum OverrideValue {
    Allow,
    Deny,
    #[default]
    Inherit,
}

impl OverrideValue {
    /// Explicit decision carried by this value, `None` for [OverrideValue::Inherit].
    #[inline]
    pub fn decision(self) -> Option<Decision> {
        match self {
            Self::Allow => Some(Decision::Allow),
            Self::Deny => Some(Decision::Deny),
            Self::Inherit => None,
        }
    }

    #[inline]
    pub fn is_inherit(self) -> bool {
        self == Self::Inherit
    }
}

impl From<Option<bool>> for OverrideValue {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Allow,
            Some(false) => Self::Deny,
            None => Self::Inherit,
        }
    }
}

impl From<OverrideValue> for Option<bool> {
    fn from(value: OverrideValue) -> Self {
        match value {
            OverrideValue::Allow => Some(true),
            OverrideValue::Deny => Some(false),
            OverrideValue::Inherit => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Fully specified permission record for one module. Used both as a profile default and as a row of
/// the effective [PermissionMatrix].
///
/// Keys missing from serialized input fall back to the hard default: `view` allowed, the rest
/// denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionPermissions {
    #[serde(default = "default_true")]
    pub view: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub approve: bool,
}

impl Default for ActionPermissions {
    fn default() -> Self {
        Self::from_fn(|action| action.hard_default().is_allowed())
    }
}

impl ActionPermissions {
    pub fn from_fn(mut f: impl FnMut(Action) -> bool) -> Self {
        ActionPermissions {
            view: f(Action::View),
            create: f(Action::Create),
            edit: f(Action::Edit),
            delete: f(Action::Delete),
            approve: f(Action::Approve),
        }
    }

    /// Every action allowed.
    pub fn all() -> Self {
        Self::from_fn(|_| true)
    }

    /// Every action denied, `view` included.
    pub fn none() -> Self {
        Self::from_fn(|_| false)
    }

    /// Only the listed actions allowed.
    pub fn from_actions(actions: &[Action]) -> Self {
        Self::from_fn(|action| actions.contains(&action))
    }

    #[inline]
    pub fn get(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
            Action::Approve => self.approve,
        }
    }

    pub fn set(&mut self, action: Action, allowed: bool) -> &mut Self {
        match action {
            Action::View => self.view = allowed,
            Action::Create => self.create = allowed,
            Action::Edit => self.edit = allowed,
            Action::Delete => self.delete = allowed,
            Action::Approve => self.approve = allowed,
        }
        self
    }

    /// Allowed actions in declaration order.
    pub fn allowed(&self) -> impl Iterator<Item = Action> + '_ {
        Action::all().filter(|action| self.get(*action))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub u64);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "profile#{}", self.0)
    }
}

/// Trait that any authenticated caller (user account, service client) must implement to be
/// resolved.
///
/// Records come from the identity subsystem; the resolver only reads them. An unauthenticated
/// caller has no subject at all and must be denied before the resolver is consulted.
pub trait Subject {
    fn id(&self) -> UserId;
    fn is_admin(&self) -> bool;
    fn is_active(&self) -> bool;
    fn profile_id(&self) -> Option<ProfileId>;
}

/// Plain user record as supplied by the identity subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub admin: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub profile_id: Option<ProfileId>,
}

impl User {
    /// Active, non-admin user without a profile.
    pub fn new(id: UserId) -> Self {
        User {
            id,
            admin: false,
            active: true,
            profile_id: None,
        }
    }

    pub fn with_profile(mut self, profile_id: ProfileId) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl Subject for User {
    fn id(&self) -> UserId {
        self.id
    }

    fn is_admin(&self) -> bool {
        self.admin
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn profile_id(&self) -> Option<ProfileId> {
        self.profile_id
    }
}

impl<S: Subject + ?Sized> Subject for &S {
    fn id(&self) -> UserId {
        (**self).id()
    }

    fn is_admin(&self) -> bool {
        (**self).is_admin()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn profile_id(&self) -> Option<ProfileId> {
        (**self).profile_id()
    }
}

/// Returned by [PermissionService::check]. Carries no hint about which rule denied the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenied {
    pub module: ModuleCode,
    pub action: Action,
}

impl fmt::Display for PermissionDenied {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Permission denied: {} on {}", self.action, self.module)
    }
}

impl std::error::Error for PermissionDenied {}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    ActionPermissions, ModuleCode, ProfileId, RegistryError, Subject, UserId, default_true,
};

/// Addressable functional area of the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub code: ModuleCode,
    pub name: String,
    /// Inactive modules deny every action for every user.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Display order, lowest first.
    #[serde(default)]
    pub order: u32,
}

impl Module {
    pub fn new(code: ModuleCode, name: &str, order: u32) -> Self {
        Module {
            code,
            name: name.to_string(),
            active: true,
            order,
        }
    }

    /// The four modules the portal ships with, all active.
    pub fn standard() -> Vec<Module> {
        vec![
            Module::new(ModuleCode::Production, "Production", 1),
            Module::new(ModuleCode::Quality, "Quality", 2),
            Module::new(ModuleCode::Sales, "Sales", 3),
            Module::new(ModuleCode::Admin, "Administration", 99),
        ]
    }
}

/// Read contract for the module catalog.
pub trait ModuleRegistry {
    fn module(&self, code: ModuleCode) -> Option<&Module>;

    /// Active modules in display order.
    fn active_modules(&self) -> Vec<&Module>;
}

#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<ModuleCode, Module>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog.load(Module::standard());
        catalog
    }

    /// Adds or replaces a module, returning the previous record.
    pub fn insert(&mut self, module: Module) -> Option<Module> {
        self.modules.insert(module.code, module)
    }

    pub fn load(&mut self, modules: Vec<Module>) {
        for module in modules {
            self.insert(module);
        }
    }

    pub fn remove(&mut self, code: ModuleCode) -> Option<Module> {
        self.modules.remove(&code)
    }

    pub fn set_active(&mut self, code: ModuleCode, active: bool) -> Result<(), RegistryError> {
        let module = self
            .modules
            .get_mut(&code)
            .ok_or(RegistryError::ModuleNotProvisioned(code))?;
        module.active = active;
        Ok(())
    }

    pub fn contains(&self, code: ModuleCode) -> bool {
        self.modules.contains_key(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleRegistry for ModuleCatalog {
    fn module(&self, code: ModuleCode) -> Option<&Module> {
        self.modules.get(&code)
    }

    fn active_modules(&self) -> Vec<&Module> {
        let mut active: Vec<&Module> = self.modules.values().filter(|m| m.active).collect();
        active.sort_by_key(|m| (m.order, m.code));
        active
    }
}

/// Profile as stored: default permissions keyed by raw module code strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileS {
    pub id: ProfileId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub level: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub default_permissions: BTreeMap<String, ActionPermissions>,
}

impl From<Profile> for ProfileS {
    fn from(value: Profile) -> Self {
        ProfileS {
            id: value.id,
            name: value.name,
            description: value.description,
            level: value.level,
            active: value.active,
            default_permissions: value
                .default_permissions
                .into_iter()
                .map(|(code, perms)| (code.code().to_string(), perms))
                .collect(),
        }
    }
}

impl TryFrom<ProfileS> for Profile {
    type Error = RegistryError;

    fn try_from(value: ProfileS) -> Result<Self, Self::Error> {
        let mut default_permissions = BTreeMap::new();
        for (code, perms) in value.default_permissions {
            let module =
                ModuleCode::from_code(&code).ok_or_else(|| RegistryError::UnknownModule {
                    profile: value.name.clone(),
                    code: code.clone(),
                })?;
            default_permissions.insert(module, perms);
        }

        Ok(Profile {
            id: value.id,
            name: value.name,
            description: value.description,
            level: value.level,
            active: value.active,
            default_permissions,
        })
    }
}

/// Named permission template shared by any number of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProfileS")]
#[serde(into = "ProfileS")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub description: Option<String>,
    /// Higher is more privileged. Only used for ordering.
    pub level: i32,
    /// Inactive profiles are hidden from listings. Users still assigned to one keep resolving
    /// against its defaults.
    pub active: bool,
    pub default_permissions: BTreeMap<ModuleCode, ActionPermissions>,
}

impl Profile {
    pub fn new(id: ProfileId, name: &str, level: i32) -> Self {
        Profile {
            id,
            name: name.to_string(),
            description: None,
            level,
            active: true,
            default_permissions: BTreeMap::new(),
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_module(mut self, module: ModuleCode, permissions: ActionPermissions) -> Self {
        self.default_permissions.insert(module, permissions);
        self
    }

    /// Default record for a module, `None` when the profile has no entry for it.
    #[inline]
    pub fn defaults_for(&self, module: ModuleCode) -> Option<&ActionPermissions> {
        self.default_permissions.get(&module)
    }
}

/// Read contract for the profile catalog.
pub trait ProfileRegistry {
    fn profile(&self, id: ProfileId) -> Option<&Profile>;
}

/// Reports which users are assigned to a profile. Implemented by the identity side, which owns
/// users.
pub trait ProfileReferences {
    fn users_with_profile(&self, profile: ProfileId) -> Vec<UserId>;
}

impl<S: Subject> ProfileReferences for [S] {
    fn users_with_profile(&self, profile: ProfileId) -> Vec<UserId> {
        self.iter()
            .filter(|user| user.profile_id() == Some(profile))
            .map(|user| user.id())
            .collect()
    }
}

impl<S: Subject> ProfileReferences for Vec<S> {
    fn users_with_profile(&self, profile: ProfileId) -> Vec<UserId> {
        self.as_slice().users_with_profile(profile)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: BTreeMap<ProfileId, Profile>,
}

impl ProfileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a profile. Names are unique across profiles.
    pub fn upsert(&mut self, profile: Profile) -> Result<Option<Profile>, RegistryError> {
        if let Some(existing) = self
            .profiles
            .values()
            .find(|p| p.name == profile.name && p.id != profile.id)
        {
            return Err(RegistryError::DuplicateProfileName {
                name: profile.name,
                existing: existing.id,
            });
        }
        Ok(self.profiles.insert(profile.id, profile))
    }

    /// Deletes a profile unless some user still references it.
    pub fn remove(
        &mut self,
        id: ProfileId,
        references: &(impl ProfileReferences + ?Sized),
    ) -> Result<Profile, RegistryError> {
        if !self.profiles.contains_key(&id) {
            return Err(RegistryError::ProfileNotFound(id));
        }
        let users = references.users_with_profile(id);
        if !users.is_empty() {
            return Err(RegistryError::ProfileInUse { profile: id, users });
        }
        self.profiles.remove(&id).ok_or(RegistryError::ProfileNotFound(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Profile> {
        self.profiles.values().find(|p| p.name == name)
    }

    /// Active profiles ordered by level, least privileged first; ties by id.
    pub fn by_level(&self) -> Vec<&Profile> {
        let mut profiles: Vec<&Profile> = self.profiles.values().filter(|p| p.active).collect();
        profiles.sort_by_key(|p| (p.level, p.id));
        profiles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileRegistry for ProfileCatalog {
    fn profile(&self, id: ProfileId) -> Option<&Profile> {
        self.profiles.get(&id)
    }
}

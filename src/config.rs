use serde::{Deserialize, Serialize};

use crate::{Module, Override, Profile};

/// Seed for a [PermissionService](crate::PermissionService).
///
/// Serializable so it can live in a config file, a database export or an external service. Profiles
/// naming unknown module codes fail to deserialize. Without a `modules` key the standard set is
/// used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzConfig {
    #[serde(default = "Module::standard")]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub overrides: Vec<Override>,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        AuthzConfig {
            modules: Module::standard(),
            profiles: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

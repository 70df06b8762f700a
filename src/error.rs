//! Errors raised at the registry boundary. The resolver itself never fails.

use crate::{ModuleCode, ProfileId, UserId};

/// A string did not name any member of a closed code set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} code `{code}`")]
pub struct ParseCodeError {
    pub kind: &'static str,
    pub code: String,
}

impl ParseCodeError {
    pub fn new(kind: &'static str, code: &str) -> Self {
        ParseCodeError {
            kind,
            code: code.to_string(),
        }
    }
}

/// Rejected write to one of the permission stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A profile default map named a module code outside [ModuleCode].
    #[error("profile `{profile}` references unknown module code `{code}`")]
    UnknownModule { profile: String, code: String },
    /// The module is part of [ModuleCode] but has not been provisioned in the catalog.
    #[error("module {0} is not provisioned")]
    ModuleNotProvisioned(ModuleCode),
    #[error("{0} not found")]
    ProfileNotFound(ProfileId),
    /// Another profile already uses this name.
    #[error("profile name `{name}` is already used by {existing}")]
    DuplicateProfileName { name: String, existing: ProfileId },
    /// Users still reference the profile; they must be reassigned first.
    #[error("{profile} is still assigned to {} user(s)", .users.len())]
    ProfileInUse { profile: ProfileId, users: Vec<UserId> },
}

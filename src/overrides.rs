use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Action, ModuleCode, OverrideValue, UserId};

/// Per-user exception to the profile defaults of one module.
///
/// Every field left as [OverrideValue::Inherit] falls through to the profile. A row with all five
/// fields inherited changes nothing and is dropped by [OverrideTable::upsert].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Override {
    pub user: UserId,
    pub module: ModuleCode,
    #[serde(default)]
    pub view: OverrideValue,
    #[serde(default)]
    pub create: OverrideValue,
    #[serde(default)]
    pub edit: OverrideValue,
    #[serde(default)]
    pub delete: OverrideValue,
    #[serde(default)]
    pub approve: OverrideValue,
}

impl Override {
    /// Row inheriting every action.
    pub fn new(user: UserId, module: ModuleCode) -> Self {
        Override {
            user,
            module,
            view: OverrideValue::Inherit,
            create: OverrideValue::Inherit,
            edit: OverrideValue::Inherit,
            delete: OverrideValue::Inherit,
            approve: OverrideValue::Inherit,
        }
    }

    pub fn with(mut self, action: Action, value: OverrideValue) -> Self {
        self.set(action, value);
        self
    }

    #[inline]
    pub fn get(&self, action: Action) -> OverrideValue {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
            Action::Approve => self.approve,
        }
    }

    pub fn set(&mut self, action: Action, value: OverrideValue) -> &mut Self {
        match action {
            Action::View => self.view = value,
            Action::Create => self.create = value,
            Action::Edit => self.edit = value,
            Action::Delete => self.delete = value,
            Action::Approve => self.approve = value,
        }
        self
    }

    pub fn is_noop(&self) -> bool {
        Action::all().all(|action| self.get(action).is_inherit())
    }
}

/// Read contract for the override store.
pub trait OverrideStore {
    fn override_for(&self, user: UserId, module: ModuleCode) -> Option<&Override>;
}

#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    rows: HashMap<(UserId, ModuleCode), Override>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the row for `(row.user, row.module)`. An all-inherit row removes the
    /// stored one instead. Returns the previous row.
    pub fn upsert(&mut self, row: Override) -> Option<Override> {
        let key = (row.user, row.module);
        if row.is_noop() {
            self.rows.remove(&key)
        } else {
            self.rows.insert(key, row)
        }
    }

    pub fn remove(&mut self, user: UserId, module: ModuleCode) -> Option<Override> {
        self.rows.remove(&(user, module))
    }

    /// Drops every row of a user so they fall back to their profile. Returns the number removed.
    pub fn clear_user(&mut self, user: UserId) -> usize {
        let before = self.rows.len();
        self.rows.retain(|(owner, _), _| *owner != user);
        before - self.rows.len()
    }

    /// Rows of one user, in module order.
    pub fn for_user(&self, user: UserId) -> Vec<&Override> {
        let mut rows: Vec<&Override> = self.rows.values().filter(|row| row.user == user).collect();
        rows.sort_by_key(|row| row.module);
        rows
    }

    pub fn users(&self) -> BTreeSet<UserId> {
        self.rows.keys().map(|(user, _)| *user).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Override> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl OverrideStore for OverrideTable {
    fn override_for(&self, user: UserId, module: ModuleCode) -> Option<&Override> {
        self.rows.get(&(user, module))
    }
}

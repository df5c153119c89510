use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Action, ActionSet, ModuleKey, PermissionRecord};

/// Module → [ActionSet] mapping of one user or role.
///
/// A module absent from the matrix reads as [ActionSet::NONE].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix {
    entries: BTreeMap<ModuleKey, ActionSet>,
}

impl PermissionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a matrix from endpoint records. Duplicate modules are OR-merged.
    pub fn from_records(records: impl IntoIterator<Item = PermissionRecord>) -> Self {
        let mut matrix = PermissionMatrix::new();
        for record in records {
            let incoming = record.actions();
            let set = matrix.entry_mut(ModuleKey::new(&record.module_name));
            for action in incoming.granted() {
                set.set(action, true);
            }
        }
        matrix
    }

    pub fn to_records(&self) -> Vec<PermissionRecord> {
        self.entries
            .iter()
            .map(|(key, actions)| PermissionRecord::new(key.as_str(), *actions))
            .collect()
    }

    #[inline]
    pub fn get(&self, module: &ModuleKey) -> ActionSet {
        self.entries.get(module).copied().unwrap_or_default()
    }

    #[inline]
    pub fn allows(&self, module: impl Into<ModuleKey>, action: Action) -> bool {
        self.get(&module.into()).get(action)
    }

    pub fn insert(&mut self, module: impl Into<ModuleKey>, actions: ActionSet) -> Option<ActionSet> {
        self.entries.insert(module.into(), actions)
    }

    /// Mutable access, inserting an all-false set for absent modules
    pub fn entry_mut(&mut self, module: ModuleKey) -> &mut ActionSet {
        self.entries.entry(module).or_default()
    }

    pub fn contains(&self, module: &ModuleKey) -> bool {
        self.entries.contains_key(module)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleKey, &ActionSet)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModuleKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<ModuleKey>> FromIterator<(K, ActionSet)> for PermissionMatrix {
    fn from_iter<I: IntoIterator<Item = (K, ActionSet)>>(iter: I) -> Self {
        PermissionMatrix {
            entries: iter
                .into_iter()
                .map(|(module, actions)| (module.into(), actions))
                .collect(),
        }
    }
}

/// Wire form of a role, as sent to the role-save API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePayload {
    pub role_name: String,
    pub permissions: Vec<PermissionRecord>,
}

impl From<RoleDefinition> for RolePayload {
    fn from(value: RoleDefinition) -> Self {
        RolePayload {
            permissions: value.matrix.to_records(),
            role_name: value.role_name,
        }
    }
}

impl From<RolePayload> for RoleDefinition {
    fn from(value: RolePayload) -> Self {
        RoleDefinition {
            matrix: PermissionMatrix::from_records(value.permissions),
            role_name: value.role_name,
        }
    }
}

/// Role with its permission matrix, as edited in the role-authoring UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RolePayload")]
#[serde(into = "RolePayload")]
pub struct RoleDefinition {
    pub role_name: String,
    pub matrix: PermissionMatrix,
}

impl RoleDefinition {
    pub fn new(role_name: &str, matrix: PermissionMatrix) -> Self {
        RoleDefinition {
            role_name: role_name.trim().to_string(),
            matrix,
        }
    }
}

//! Cascading permission rules used while authoring roles.
//!
//! All functions are pure: they take a matrix and return the edited copy. Per module the state
//! is four independent flags with one-directional enable edges ([Action::implies]):
//! `add → {view, update, delete}`, `update → {view}`, `delete → {view}`. Nothing cascades on
//! disable, and nothing cascades on an exempt module.

use std::collections::BTreeSet;

use crate::{Action, ActionSet, ModuleKey, ModuleRegistry, PermissionMatrix, RoleDefinition};

/// State of one action column across the non-exempt modules, for a tri-state header checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnState {
    All,
    Some,
    None,
}

/// Declared modules plus whatever else the matrix already carries
fn modules_in_scope(matrix: &PermissionMatrix, registry: &ModuleRegistry) -> BTreeSet<ModuleKey> {
    registry.keys().chain(matrix.keys()).cloned().collect()
}

fn cascading_modules(matrix: &PermissionMatrix, registry: &ModuleRegistry) -> Vec<ModuleKey> {
    modules_in_scope(matrix, registry)
        .into_iter()
        .filter(|module| !registry.is_exempt(module))
        .collect()
}

/// Flips one flag. Switching `add`, `update` or `delete` on enables its prerequisites unless the
/// module is exempt.
pub fn toggle_action(
    matrix: &PermissionMatrix,
    registry: &ModuleRegistry,
    module: impl Into<ModuleKey>,
    action: Action,
) -> PermissionMatrix {
    let module = module.into();
    let cascade = !registry.is_exempt(&module);
    let mut next = matrix.clone();
    let set = next.entry_mut(module);
    if set.get(action) {
        set.set(action, false);
    } else {
        set.enable(action, cascade);
    }
    next
}

/// Switches a whole column. If any non-exempt module lacks `action`, every non-exempt module
/// gets it (with cascade); otherwise the column is cleared without cascade. The exempt module
/// is left as it is.
pub fn toggle_column(
    matrix: &PermissionMatrix,
    registry: &ModuleRegistry,
    action: Action,
) -> PermissionMatrix {
    let targets = cascading_modules(matrix, registry);
    let all_on = targets.iter().all(|module| matrix.get(module).get(action));

    let mut next = matrix.clone();
    for module in targets {
        let set = next.entry_mut(module);
        if all_on {
            set.set(action, false);
        } else {
            set.enable(action, true);
        }
    }
    next
}

/// Grants everything on every non-exempt module. The exempt module is forced to all-false.
pub fn tick_all_permissions(matrix: &PermissionMatrix, registry: &ModuleRegistry) -> PermissionMatrix {
    let mut next = matrix.clone();
    for module in modules_in_scope(matrix, registry) {
        let actions = if registry.is_exempt(&module) {
            ActionSet::NONE
        } else {
            ActionSet::ALL
        };
        next.insert(module, actions);
    }
    next
}

pub fn untick_all_permissions(matrix: &PermissionMatrix, registry: &ModuleRegistry) -> PermissionMatrix {
    let mut next = matrix.clone();
    for module in modules_in_scope(matrix, registry) {
        next.insert(module, ActionSet::NONE);
    }
    next
}

pub fn column_state(matrix: &PermissionMatrix, registry: &ModuleRegistry, action: Action) -> ColumnState {
    let targets = cascading_modules(matrix, registry);
    let on = targets
        .iter()
        .filter(|module| matrix.get(module).get(action))
        .count();
    match on {
        0 => ColumnState::None,
        n if n == targets.len() => ColumnState::All,
        _ => ColumnState::Some,
    }
}

/// Non-exempt modules where `view` is off while `add`, `update` or `delete` is on.
///
/// Disabling `view` does not cascade, so such a matrix is reachable and is kept as is; this only
/// reports it.
pub fn cascade_gaps(matrix: &PermissionMatrix, registry: &ModuleRegistry) -> Vec<ModuleKey> {
    matrix
        .iter()
        .filter(|(module, actions)| !registry.is_exempt(module) && actions.has_cascade_gap())
        .map(|(module, _)| module.clone())
        .collect()
}

/// Role-authoring state: one role being edited against a module registry
#[derive(Debug, Clone)]
pub struct RoleEditor<'r> {
    registry: &'r ModuleRegistry,
    role: RoleDefinition,
}

impl<'r> RoleEditor<'r> {
    pub fn new(registry: &'r ModuleRegistry, role: RoleDefinition) -> Self {
        RoleEditor { registry, role }
    }

    pub fn role(&self) -> &RoleDefinition {
        &self.role
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.role.matrix
    }

    pub fn rename(&mut self, role_name: &str) -> &mut Self {
        self.role.role_name = role_name.trim().to_string();
        self
    }

    pub fn toggle_action(&mut self, module: impl Into<ModuleKey>, action: Action) -> &mut Self {
        self.role.matrix = toggle_action(&self.role.matrix, self.registry, module, action);
        self
    }

    pub fn toggle_column(&mut self, action: Action) -> &mut Self {
        self.role.matrix = toggle_column(&self.role.matrix, self.registry, action);
        self
    }

    pub fn tick_all(&mut self) -> &mut Self {
        self.role.matrix = tick_all_permissions(&self.role.matrix, self.registry);
        self
    }

    pub fn untick_all(&mut self) -> &mut Self {
        self.role.matrix = untick_all_permissions(&self.role.matrix, self.registry);
        self
    }

    pub fn column_state(&self, action: Action) -> ColumnState {
        column_state(&self.role.matrix, self.registry, action)
    }

    pub fn cascade_gaps(&self) -> Vec<ModuleKey> {
        cascade_gaps(&self.role.matrix, self.registry)
    }

    pub fn finish(self) -> RoleDefinition {
        self.role
    }
}

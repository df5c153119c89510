use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ModuleKey, PermissionModule};

/// Registry entry of one declared module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub key: ModuleKey,
    pub display_name: String,
    pub exempt: bool,
}

/// Catalogue of declared modules and their exemption attribute
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    entries: BTreeMap<ModuleKey, ModuleEntry>,
}

impl ModuleRegistry {
    /// Creates builder ([ModuleRegistryBuilder]) for [ModuleRegistry]
    pub fn builder() -> ModuleRegistryBuilder {
        ModuleRegistryBuilder {
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding exactly the variants of one module enumeration
    pub fn of<M: PermissionModule>() -> Self {
        Self::builder().register::<M>().build()
    }

    pub fn get(&self, key: &ModuleKey) -> Option<&ModuleEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Undeclared modules are never exempt
    #[inline]
    pub fn is_exempt(&self, key: &ModuleKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.exempt)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModuleKey> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// ModuleRegistryBuilder - collects module declarations from one or more enumerations,
/// plus modules only known by name (e.g. added on the server later).
pub struct ModuleRegistryBuilder {
    entries: BTreeMap<ModuleKey, ModuleEntry>,
}

impl ModuleRegistryBuilder {
    pub fn build(&self) -> ModuleRegistry {
        ModuleRegistry {
            entries: self.entries.clone(),
        }
    }

    pub fn register<M: PermissionModule>(&mut self) -> &mut Self {
        for module in M::all_modules() {
            self.insert(ModuleEntry {
                key: module.key(),
                display_name: module.display_name().to_string(),
                exempt: module.is_exempt(),
            });
        }
        self
    }

    /// Declares a module by name. Re-declaring a module replaces the earlier entry.
    pub fn add_module(&mut self, display_name: &str, exempt: bool) -> &mut Self {
        self.insert(ModuleEntry {
            key: ModuleKey::new(display_name),
            display_name: display_name.trim().to_string(),
            exempt,
        });
        self
    }

    fn insert(&mut self, entry: ModuleEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }
}

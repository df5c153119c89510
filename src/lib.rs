//! Role/permission-matrix authorization gate with live server re-validation.
//!
//! Every protected action of a console (navigation, create/update/delete buttons) goes through
//! [AuthorizationGate::guard]. The gate asks the permission authority for a fresh matrix before
//! each decision, so a grant revoked on the server stops working on the very next click.
//! Client admins bypass the matrix entirely, and a failed refresh falls back to the last known
//! matrix (or denies, if there is none).
//!
//! Modules are declared as a closed enumeration with [define_modules!]. A module may be marked
//! `(exempt)`: cascade rules and "select all" never touch it, so each of its actions has to be
//! granted by hand.
//!
//! Role authoring works on plain [PermissionMatrix] values through the cascade rules in [rules]:
//! enabling `add` also enables `view`, `update` and `delete`; enabling `update` or `delete`
//! also enables `view`. Disabling never cascades.
//!
//! Example usage:
//!```
//! use rolegate::*;
//!
//! define_modules! {
//!     /// Modules of a small HR console
//!     pub modules Console {
//!         Policies => "Policies",
//!         Employee => "Employee",
//!         SupportingTickets => "Supporting Tickets" (exempt),
//!     }
//! }
//!
//! fn test_rules() {
//!     let registry = ModuleRegistry::builder().register::<Console>().build();
//!
//!     // Enabling "add" pulls in its prerequisites
//!     let matrix = rules::toggle_action(&PermissionMatrix::new(), &registry, Console::Policies, Action::Add);
//!     assert_eq!(matrix.get(&Console::Policies.key()), ActionSet::ALL);
//!
//!     // Disabling "view" afterwards does not cascade
//!     let matrix = rules::toggle_action(&matrix, &registry, Console::Policies, Action::View);
//!     assert!(!matrix.allows(Console::Policies, Action::View));
//!     assert!(matrix.allows(Console::Policies, Action::Delete));
//!
//!     // "Select all" leaves the exempt module untouched
//!     let matrix = rules::tick_all_permissions(&matrix, &registry);
//!     assert!(matrix.allows(" employee ", Action::Add));
//!     assert_eq!(matrix.get(&Console::SupportingTickets.key()), ActionSet::NONE);
//! }
//!
//! test_rules();
//!```
use std::{fmt, str::FromStr};

mod api;
mod config;
mod error;
mod fetcher;
mod gate;
mod r#macro;
mod matrix;
mod modules;
mod registry;
pub mod rules;
mod session;
mod store;
mod wire;

use serde::{Deserialize, Serialize};

pub use api::ApiClient;
pub use config::{
    ApiConfig, ConfigError, GateConfig, load_config_from_path, load_config_from_reader,
    parse_config_str,
};
pub use error::{AuthError, ParseActionError, StoreError, TransportError};
pub use fetcher::{PermissionFetcher, PermissionSource};
pub use gate::{AuthorizationGate, Decision, Denial, DenialHandler, Grant, GuardOutcome, LogDenials};
pub use matrix::{PermissionMatrix, RoleDefinition, RolePayload};
pub use modules::{HrModule, hr_registry};
pub use registry::{ModuleEntry, ModuleRegistry, ModuleRegistryBuilder};
pub use rules::{ColumnState, RoleEditor};
pub use session::{
    AuthApi, Credentials, InitOutcome, SessionLifecycle, SessionState, parse_login_response,
};
pub use store::{FileBackend, MemoryBackend, PermissionStore, Session, StateBackend, StoredSession};
pub use wire::{PermissionRecord, decode_records};

/// Trait implemented by every module enumeration, usually through [define_modules!]
pub trait PermissionModule:
    Sized + fmt::Display + fmt::Debug + Copy + Eq + std::hash::Hash + 'static
{
    /// Human readable name (e.g. "Supporting Tickets")
    fn display_name(&self) -> &'static str;

    /// Exempt modules are skipped by every cascade rule and by "select all"
    fn is_exempt(&self) -> bool;

    /// Every variant of the enumeration
    fn all_modules() -> Vec<Self>;

    /// Normalized identity of the module
    fn key(&self) -> ModuleKey {
        ModuleKey::new(self.display_name())
    }
}

/// Normalized module identity: trimmed and lower-cased.
///
/// All constructors normalize, so "Policies", " policies " and "POLICIES" are the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ModuleKey(String);

impl ModuleKey {
    pub fn new(raw: &str) -> Self {
        ModuleKey(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleKey {
    fn from(value: &str) -> Self {
        ModuleKey::new(value)
    }
}

impl From<String> for ModuleKey {
    fn from(value: String) -> Self {
        ModuleKey::new(&value)
    }
}

impl From<&String> for ModuleKey {
    fn from(value: &String) -> Self {
        ModuleKey::new(value)
    }
}

impl From<&ModuleKey> for ModuleKey {
    fn from(value: &ModuleKey) -> Self {
        value.clone()
    }
}

impl From<ModuleKey> for String {
    fn from(value: ModuleKey) -> Self {
        value.0
    }
}

/// Numeric user identifier issued by the auth endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        UserId(value)
    }
}

/// One of the four actions a module grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Add,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Add, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Add => "add",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Actions switched on together with this one on a non-exempt module.
    /// Edges only go one way: nothing is implied on disable.
    pub fn implies(&self) -> &'static [Action] {
        match self {
            Action::Add => &[Action::View, Action::Update, Action::Delete],
            Action::Update | Action::Delete => &[Action::View],
            Action::View => &[],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Action::View),
            "add" => Ok(Action::Add),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(ParseActionError(s.to_string())),
        }
    }
}

/// The four action flags of one module. Missing flags deserialize as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSet {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub add: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
}

impl ActionSet {
    pub const NONE: ActionSet = ActionSet {
        view: false,
        add: false,
        update: false,
        delete: false,
    };

    pub const ALL: ActionSet = ActionSet {
        view: true,
        add: true,
        update: true,
        delete: true,
    };

    #[inline]
    pub fn get(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Add => self.add,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }

    #[inline]
    pub fn set(&mut self, action: Action, value: bool) {
        match action {
            Action::View => self.view = value,
            Action::Add => self.add = value,
            Action::Update => self.update = value,
            Action::Delete => self.delete = value,
        }
    }

    /// Switches `action` on, and with `cascade` everything it [implies](Action::implies)
    pub fn enable(&mut self, action: Action, cascade: bool) {
        self.set(action, true);
        if cascade {
            for implied in action.implies() {
                self.set(*implied, true);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ActionSet::NONE
    }

    pub fn is_full(&self) -> bool {
        *self == ActionSet::ALL
    }

    pub fn granted(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|action| self.get(*action))
    }

    /// `view` is off while something that depends on it is on
    pub fn has_cascade_gap(&self) -> bool {
        !self.view && (self.add || self.update || self.delete)
    }
}

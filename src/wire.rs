//! Wire shapes of the permission-authority and auth endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{ActionSet, UserId};

/// One record of the permission-authority response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub module_name: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub view: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub add: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub update: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub delete: bool,
}

impl PermissionRecord {
    pub fn new(module_name: &str, actions: ActionSet) -> Self {
        PermissionRecord {
            module_name: module_name.to_string(),
            view: actions.view,
            add: actions.add,
            update: actions.update,
            delete: actions.delete,
        }
    }

    pub fn actions(&self) -> ActionSet {
        ActionSet {
            view: self.view,
            add: self.add,
            update: self.update,
            delete: self.delete,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct PermissionRequest {
    pub user_id: UserId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsEnvelope {
    Bare(Vec<PermissionRecord>),
    Data { data: Vec<PermissionRecord> },
    Permissions { permissions: Vec<PermissionRecord> },
}

/// Decodes a permission-authority response: a bare list of records, or the list wrapped in
/// `{"data": [...]}` / `{"permissions": [...]}`.
pub fn decode_records(body: &[u8]) -> Result<Vec<PermissionRecord>, serde_json::Error> {
    let records = match serde_json::from_slice::<RecordsEnvelope>(body)? {
        RecordsEnvelope::Bare(records) => records,
        RecordsEnvelope::Data { data } => data,
        RecordsEnvelope::Permissions { permissions } => permissions,
    };
    Ok(records)
}

/// Flag as backends actually send it: bool, 0/1, "0"/"1", "true"/"false"
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Flag {
    fn truthy(self) -> bool {
        match self {
            Flag::Bool(value) => value,
            Flag::Int(value) => value != 0,
            Flag::Float(value) => value != 0.0,
            Flag::Text(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
        }
    }
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = Option::<Flag>::deserialize(deserializer)?;
    Ok(flag.is_some_and(Flag::truthy))
}

/// Same truthiness as record flags, for values picked out of a loose JSON document
pub(crate) fn truthy(value: &Value) -> bool {
    Option::<Flag>::deserialize(value)
        .ok()
        .flatten()
        .is_some_and(Flag::truthy)
}

/// Follows a dotted path (`data.user.id`). Null counts as absent.
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |node, segment| node.get(segment))
        .filter(|found| !found.is_null())
}

/// First candidate path that is present
pub(crate) fn first_present<'a>(value: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|path| lookup(value, path))
}

pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

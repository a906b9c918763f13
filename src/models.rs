use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---- Task schema as persisted by the backend ----
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub task_json: TaskJson,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: BTreeMap<String, String>,
    // Backend timestamps are passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskJson {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Page {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key_value_pairs: Vec<KeyValuePair>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Body of `POST /tasks` and `PUT /tasks/{id}`.
///
/// Unknown fields (`id`, timestamps) are ignored so a full [`Task`] pasted in
/// JSON mode still validates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreatePayload {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub task_json: TaskJson,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: BTreeMap<String, String>,
}

impl From<&Task> for TaskCreatePayload {
    fn from(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            task_json: task.task_json.clone(),
            variables: task.variables.clone(),
        }
    }
}

/// Envelope returned by `GET /tasks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Task>,
}

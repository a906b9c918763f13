//! Conversion between the persisted task shape and the editor's expanded
//! state.
//!
//! Expanding keeps a step's persisted key-value pairs as they are. A pair is
//! synthesized from `variable` (`{key: variable, value: variable}`) only when
//! the persisted list is empty, so `flatten(expand(t))` reproduces `t` for
//! multi-pair steps too, apart from that one synthesized display row.

use std::collections::BTreeMap;

use super::state::{EditState, Variable};
use crate::models::{Page, Task, TaskCreatePayload, TaskJson};

/// Build edit state from a persisted task.
pub fn expand(task: &Task) -> EditState {
    expand_parts(&task.task_json.pages, &task.variables)
}

/// Build edit state from a payload, e.g. one parsed out of the JSON buffer.
pub fn expand_payload(payload: &TaskCreatePayload) -> EditState {
    expand_parts(&payload.task_json.pages, &payload.variables)
}

fn expand_parts(pages: &[Page], variables: &BTreeMap<String, String>) -> EditState {
    let mut state = EditState::new();
    for page in pages {
        state.push_page(page);
    }
    for (key, value) in variables {
        state.push_variable(key, value);
    }
    state
}

/// Fold variable rows into the persisted mapping. Later rows win on
/// duplicate keys.
pub fn flatten_variables(rows: &[Variable]) -> BTreeMap<String, String> {
    rows.iter()
        .map(|v| (v.key.clone(), v.value.clone()))
        .collect()
}

/// Produce the create/update body for the current edit state.
pub fn flatten(name: &str, state: &EditState) -> TaskCreatePayload {
    TaskCreatePayload {
        name: name.to_string(),
        task_json: TaskJson { pages: state.pages() },
        variables: flatten_variables(&state.variables()),
    }
}

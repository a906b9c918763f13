use tracing::{info, warn};

use super::codec;
use super::command::EditCommand;
use super::state::EditState;
use crate::api::TaskBackend;
use crate::error::{EditError, SaveError};
use crate::models::{Task, TaskCreatePayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Form,
    Json,
}

/// One open task editor: the draft tree, the name, the input mode and the
/// raw JSON buffer.
///
/// Switching modes re-derives the other representation from the current one
/// in both directions, so nothing typed in either mode is lost.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    editing: Option<Task>,
    name: String,
    state: EditState,
    mode: InputMode,
    json_input: String,
}

impl EditorSession {
    /// Blank editor for a new task.
    pub fn create() -> Self {
        Self::default()
    }

    /// Editor pre-filled from an existing task.
    pub fn edit(task: Task) -> Self {
        Self {
            name: task.name.clone(),
            state: codec::expand(&task),
            editing: Some(task),
            mode: InputMode::Form,
            json_input: String::new(),
        }
    }

    pub fn editing(&self) -> Option<&Task> {
        self.editing.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn json_input(&self) -> &str {
        &self.json_input
    }

    pub fn set_json_input(&mut self, text: impl Into<String>) {
        self.json_input = text.into();
    }

    pub fn apply(&mut self, cmd: EditCommand) -> Result<(), EditError> {
        self.state.apply(cmd)
    }

    /// Switch input mode.
    ///
    /// Form → JSON renders the live draft into the buffer. JSON → form parses
    /// the buffer back into the draft; if it does not parse, the session
    /// stays in JSON mode with the buffer untouched.
    pub fn set_mode(&mut self, mode: InputMode) -> Result<(), SaveError> {
        if mode == self.mode {
            return Ok(());
        }
        match mode {
            InputMode::Json => {
                self.json_input = self.render_json()?;
            }
            InputMode::Form => {
                let payload = parse_payload(&self.json_input)?;
                self.name = payload.name.clone();
                self.state = codec::expand_payload(&payload);
            }
        }
        info!(?mode, "editor input mode changed");
        self.mode = mode;
        Ok(())
    }

    /// The request body a save would send right now.
    pub fn payload(&self) -> Result<TaskCreatePayload, SaveError> {
        let payload = match self.mode {
            InputMode::Form => codec::flatten(self.name.trim(), &self.state),
            InputMode::Json => parse_payload(&self.json_input)?,
        };
        if payload.name.trim().is_empty() {
            return Err(SaveError::MissingName);
        }
        Ok(payload)
    }

    /// Validate and submit. Nothing is sent if validation fails.
    pub async fn save<B>(&mut self, backend: &B) -> Result<Task, SaveError>
    where
        B: TaskBackend + ?Sized,
    {
        let payload = match self.payload() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "save rejected");
                return Err(e);
            }
        };
        let saved = match &self.editing {
            Some(task) => {
                info!(id = task.id, name = %payload.name, "updating task");
                backend.update_task(task.id, &payload).await?
            }
            None => {
                info!(name = %payload.name, "creating task");
                backend.create_task(&payload).await?
            }
        };
        self.editing = Some(saved.clone());
        Ok(saved)
    }

    fn render_json(&self) -> Result<String, SaveError> {
        let payload = codec::flatten(&self.name, &self.state);
        let text = match &self.editing {
            // Keep id and timestamps visible when editing an existing task.
            Some(task) => {
                let mut doc = task.clone();
                doc.name = payload.name;
                doc.task_json = payload.task_json;
                doc.variables = payload.variables;
                serde_json::to_string_pretty(&doc)
            }
            None => serde_json::to_string_pretty(&payload),
        };
        text.map_err(SaveError::from_json)
    }
}

fn parse_payload(text: &str) -> Result<TaskCreatePayload, SaveError> {
    serde_json::from_str(text).map_err(SaveError::from_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::command::{PairField, StepField};
    use crate::editor::state::Variable;
    use crate::error::ApiError;
    use crate::models::{KeyValuePair, Page, Step, TaskJson};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(Option<i64>, TaskCreatePayload)>>,
    }

    #[async_trait]
    impl TaskBackend for RecordingBackend {
        async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
            Ok(vec![])
        }

        async fn create_task(&self, payload: &TaskCreatePayload) -> Result<Task, ApiError> {
            self.calls.lock().unwrap().push((None, payload.clone()));
            Ok(Task {
                id: 100,
                name: payload.name.clone(),
                task_json: payload.task_json.clone(),
                variables: payload.variables.clone(),
                created_at: None,
                updated_at: None,
            })
        }

        async fn update_task(&self, id: i64, payload: &TaskCreatePayload) -> Result<Task, ApiError> {
            self.calls.lock().unwrap().push((Some(id), payload.clone()));
            Ok(Task {
                id,
                name: payload.name.clone(),
                task_json: payload.task_json.clone(),
                variables: payload.variables.clone(),
                created_at: None,
                updated_at: None,
            })
        }
    }

    fn existing_task() -> Task {
        Task {
            id: 5,
            name: "scrape prices".into(),
            task_json: TaskJson {
                pages: vec![Page {
                    url: "https://shop.example.com".into(),
                    steps: vec![Step {
                        action: "read".into(),
                        location: ".price".into(),
                        variable: None,
                        key_value_pairs: vec![KeyValuePair::new("currency", "EUR")],
                    }],
                }],
            },
            variables: BTreeMap::from([("user".to_string(), "bob".to_string())]),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_fresh_editor_save_in_form_mode() {
        let backend = RecordingBackend::default();
        let mut session = EditorSession::create();
        session.set_name("click it");
        session.apply(EditCommand::AddPage).unwrap();
        session.apply(EditCommand::AddStep { page: 0 }).unwrap();
        session
            .apply(EditCommand::UpdateStep { page: 0, step: 0, field: StepField::SetAction("click".into()) })
            .unwrap();

        let saved = session.save(&backend).await.unwrap();
        assert_eq!(saved.id, 100);

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, None);
        assert_eq!(
            serde_json::to_value(&calls[0].1).unwrap(),
            serde_json::json!({
                "name": "click it",
                "taskJson": { "pages": [{ "url": "", "steps": [
                    { "action": "click", "location": "", "keyValuePairs": [] }
                ] }] },
                "variables": {}
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_json_sends_nothing() {
        let backend = RecordingBackend::default();
        let mut session = EditorSession::create();
        session.set_mode(InputMode::Json).unwrap();
        session.set_json_input("{not valid}");

        let err = session.save(&backend).await.unwrap_err();
        assert!(matches!(err, SaveError::InvalidJson { .. }));
        assert!(err.is_correctable());
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_name_sends_nothing() {
        let backend = RecordingBackend::default();
        let mut session = EditorSession::create();
        session.set_name("   ");
        assert!(matches!(session.save(&backend).await, Err(SaveError::MissingName)));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_saves_with_update() {
        let backend = RecordingBackend::default();
        let mut session = EditorSession::edit(existing_task());
        session
            .apply(EditCommand::UpdateVariable { index: 0, field: PairField::SetValue("alice".into()) })
            .unwrap();

        session.save(&backend).await.unwrap();
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].0, Some(5));
        assert_eq!(calls[0].1.variables.get("user").map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_edit_shows_one_variable_row() {
        let session = EditorSession::edit(existing_task());
        assert_eq!(session.state().variables(), vec![Variable::new("user", "bob")]);
        assert_eq!(session.name(), "scrape prices");
    }

    #[test]
    fn test_json_mode_reflects_unsaved_form_edits() {
        let mut session = EditorSession::edit(existing_task());
        session
            .apply(EditCommand::SetPageUrl { page: 0, url: "https://shop.example.com/sale".into() })
            .unwrap();
        session.set_mode(InputMode::Json).unwrap();

        let doc: serde_json::Value = serde_json::from_str(session.json_input()).unwrap();
        assert_eq!(doc["id"], 5);
        assert_eq!(doc["taskJson"]["pages"][0]["url"], "https://shop.example.com/sale");
    }

    #[test]
    fn test_json_edits_flow_back_into_form() {
        let mut session = EditorSession::create();
        session.set_mode(InputMode::Json).unwrap();
        session.set_json_input(
            r#"{"name":"from json","taskJson":{"pages":[{"url":"https://a","steps":[]}]},"variables":{"k":"v"}}"#,
        );
        session.set_mode(InputMode::Form).unwrap();

        assert_eq!(session.mode(), InputMode::Form);
        assert_eq!(session.name(), "from json");
        assert_eq!(session.state().pages()[0].url, "https://a");
        assert_eq!(session.state().variables(), vec![Variable::new("k", "v")]);
    }

    #[test]
    fn test_unparseable_json_blocks_toggle_back() {
        let mut session = EditorSession::edit(existing_task());
        session.set_mode(InputMode::Json).unwrap();
        session.set_json_input("{ broken");

        assert!(session.set_mode(InputMode::Form).is_err());
        assert_eq!(session.mode(), InputMode::Json);
        assert_eq!(session.json_input(), "{ broken");
        assert_eq!(session.state().page_count(), 1);
    }

    #[test]
    fn test_json_payload_requires_name() {
        let mut session = EditorSession::create();
        session.set_mode(InputMode::Json).unwrap();
        session.set_json_input(r#"{"name":"","variables":{}}"#);
        assert!(matches!(session.payload(), Err(SaveError::MissingName)));
    }
}

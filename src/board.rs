use tracing::{info, warn};

use crate::api::TaskBackend;
use crate::editor::EditorSession;
use crate::error::{ApiError, SaveError};
use crate::models::Task;

/// The task table: the last list fetched from the backend and at most one
/// open editor.
#[derive(Debug, Default)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    editor: Option<EditorSession>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn find(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Reload the list. On failure the previous list is kept.
    pub async fn refresh<B>(&mut self, backend: &B) -> Result<&[Task], ApiError>
    where
        B: TaskBackend + ?Sized,
    {
        match backend.list_tasks().await {
            Ok(tasks) => {
                info!(count = tasks.len(), "task list refreshed");
                self.tasks = tasks;
                Ok(&self.tasks)
            }
            Err(e) => {
                warn!(error = %e, "task list refresh failed; keeping previous list");
                Err(e)
            }
        }
    }

    /// Open a blank editor, discarding any open one.
    pub fn open_new(&mut self) -> &mut EditorSession {
        self.editor.insert(EditorSession::create())
    }

    /// Open an editor on a listed task. `None` if the id is not in the list.
    pub fn open_existing(&mut self, id: i64) -> Option<&mut EditorSession> {
        let task = self.find(id)?.clone();
        Some(self.editor.insert(EditorSession::edit(task)))
    }

    pub fn editor(&mut self) -> Option<&mut EditorSession> {
        self.editor.as_mut()
    }

    /// Discard the open editor and its draft.
    pub fn cancel(&mut self) {
        self.editor = None;
    }

    /// Save the open editor, then close it and reload the list.
    ///
    /// If the save fails the editor stays open with its draft so the user can
    /// correct it; the list is left as it was. A failed reload after a
    /// successful save is logged only.
    pub async fn submit<B>(&mut self, backend: &B) -> Result<Task, SaveError>
    where
        B: TaskBackend + ?Sized,
    {
        let Some(editor) = self.editor.as_mut() else {
            return Err(SaveError::InvalidPayload("no task is open".into()));
        };
        let saved = editor.save(backend).await?;
        self.editor = None;
        if self.refresh(backend).await.is_err() {
            warn!(id = saved.id, "saved task but could not reload the list");
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::InputMode;
    use crate::models::TaskCreatePayload;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    struct FakeBackend {
        tasks: Mutex<Vec<Task>>,
        writes: Mutex<usize>,
        fail_list: bool,
    }

    impl FakeBackend {
        fn with(tasks: Vec<Task>) -> Self {
            Self { tasks: Mutex::new(tasks), writes: Mutex::new(0), fail_list: false }
        }
    }

    fn task(id: i64, name: &str) -> Task {
        Task {
            id,
            name: name.into(),
            task_json: Default::default(),
            variables: Default::default(),
            created_at: None,
            updated_at: None,
        }
    }

    #[async_trait]
    impl TaskBackend for FakeBackend {
        async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
            if self.fail_list {
                return Err(ApiError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: "boom".into(),
                });
            }
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn create_task(&self, payload: &TaskCreatePayload) -> Result<Task, ApiError> {
            *self.writes.lock().unwrap() += 1;
            let mut tasks = self.tasks.lock().unwrap();
            let created = task(tasks.len() as i64 + 1, &payload.name);
            tasks.push(created.clone());
            Ok(created)
        }

        async fn update_task(&self, id: i64, payload: &TaskCreatePayload) -> Result<Task, ApiError> {
            *self.writes.lock().unwrap() += 1;
            let mut tasks = self.tasks.lock().unwrap();
            let slot = tasks.iter_mut().find(|t| t.id == id).ok_or(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            })?;
            slot.name = payload.name.clone();
            Ok(slot.clone())
        }
    }

    #[tokio::test]
    async fn test_invalid_json_leaves_board_untouched() {
        let backend = FakeBackend::with(vec![task(1, "a")]);
        let mut board = TaskBoard::new();
        board.refresh(&backend).await.unwrap();

        let editor = board.open_new();
        editor.set_mode(InputMode::Json).unwrap();
        editor.set_json_input("{not valid}");

        assert!(board.submit(&backend).await.is_err());
        assert_eq!(*backend.writes.lock().unwrap(), 0);
        assert_eq!(board.tasks(), &[task(1, "a")]);
        assert!(board.editor().is_some());
    }

    #[tokio::test]
    async fn test_submit_closes_editor_and_reloads() {
        let backend = FakeBackend::with(vec![task(1, "a")]);
        let mut board = TaskBoard::new();
        board.refresh(&backend).await.unwrap();

        board.open_existing(1).unwrap().set_name("renamed");
        let saved = board.submit(&backend).await.unwrap();

        assert_eq!(saved.name, "renamed");
        assert!(board.editor().is_none());
        assert_eq!(board.find(1).unwrap().name, "renamed");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_list() {
        let mut backend = FakeBackend::with(vec![task(1, "a")]);
        let mut board = TaskBoard::new();
        board.refresh(&backend).await.unwrap();

        backend.fail_list = true;
        assert!(board.refresh(&backend).await.is_err());
        assert_eq!(board.tasks().len(), 1);
    }

    #[test]
    fn test_open_unknown_task() {
        let mut board = TaskBoard::new();
        assert!(board.open_existing(42).is_none());
        board.open_new();
        board.cancel();
        assert!(board.editor().is_none());
    }
}

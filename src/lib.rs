//! Client for authoring browser-automation task definitions against the
//! admin backend: a nested page/step/pair editor, its conversion to and from
//! the persisted task shape, and the REST calls that load and save tasks.

pub mod api;
pub mod board;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod models;
pub mod session;

pub use api::{Client, TaskBackend};
pub use board::TaskBoard;
pub use editor::{EditCommand, EditState, EditorSession, InputMode, PairField, StepField};
pub use error::{ApiError, EditError, SaveError};
pub use models::{KeyValuePair, Page, Step, Task, TaskCreatePayload, TaskJson};

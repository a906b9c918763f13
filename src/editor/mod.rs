pub mod codec;
pub mod command;
pub mod session;
pub mod state;

pub use command::{EditCommand, PairField, StepField};
pub use session::{EditorSession, InputMode};
pub use state::{EditState, PageId, PairId, StepId, Variable, VariableId};

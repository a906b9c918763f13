use tracing::debug;

use super::state::EditState;
use crate::error::EditError;

/// Field update on a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepField {
    SetAction(String),
    SetLocation(String),
    /// Empty string clears the captured variable.
    SetVariable(String),
}

/// Field update on a key-value pair or a variable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairField {
    SetKey(String),
    SetValue(String),
}

/// Every mutation the editor can make, addressed by structural position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    AddPage,
    RemovePage { page: usize },
    SetPageUrl { page: usize, url: String },
    AddStep { page: usize },
    UpdateStep { page: usize, step: usize, field: StepField },
    RemoveStep { page: usize, step: usize },
    AddPair { page: usize, step: usize },
    UpdatePair { page: usize, step: usize, pair: usize, field: PairField },
    RemovePair { page: usize, step: usize, pair: usize },
    AddVariable,
    RemoveVariable { index: usize },
    UpdateVariable { index: usize, field: PairField },
}

impl EditState {
    /// Apply one command. Indices are resolved against the current order
    /// lists before anything changes, so a failed command leaves the state
    /// untouched.
    pub fn apply(&mut self, cmd: EditCommand) -> Result<(), EditError> {
        debug!(?cmd, "apply edit");
        match cmd {
            EditCommand::AddPage => {
                self.add_page();
            }
            EditCommand::RemovePage { page } => {
                let id = self.page_id(page)?;
                self.remove_page(id);
            }
            EditCommand::SetPageUrl { page, url } => {
                let id = self.page_id(page)?;
                self.set_page_url(id, url);
            }
            EditCommand::AddStep { page } => {
                let id = self.page_id(page)?;
                self.add_step(id);
            }
            EditCommand::UpdateStep { page, step, field } => {
                let id = self.step_id(page, step)?;
                match field {
                    StepField::SetAction(v) => self.set_action(id, v),
                    StepField::SetLocation(v) => self.set_location(id, v),
                    StepField::SetVariable(v) => self.set_variable(id, v),
                };
            }
            EditCommand::RemoveStep { page, step } => {
                let step_id = self.step_id(page, step)?;
                let page_id = self.page_id(page)?;
                self.remove_step(page_id, step_id);
            }
            EditCommand::AddPair { page, step } => {
                let id = self.step_id(page, step)?;
                self.add_pair(id);
            }
            EditCommand::UpdatePair { page, step, pair, field } => {
                let id = self.pair_id(page, step, pair)?;
                match field {
                    PairField::SetKey(v) => self.set_pair_key(id, v),
                    PairField::SetValue(v) => self.set_pair_value(id, v),
                };
            }
            EditCommand::RemovePair { page, step, pair } => {
                let pair_id = self.pair_id(page, step, pair)?;
                let step_id = self.step_id(page, step)?;
                self.remove_pair(step_id, pair_id);
            }
            EditCommand::AddVariable => {
                self.add_variable();
            }
            EditCommand::RemoveVariable { index } => {
                let id = self.variable_id(index)?;
                self.remove_variable(id);
            }
            EditCommand::UpdateVariable { index, field } => {
                let id = self.variable_id(index)?;
                match field {
                    PairField::SetKey(v) => self.set_variable_key(id, v),
                    PairField::SetValue(v) => self.set_variable_value(id, v),
                };
            }
        }
        Ok(())
    }
}

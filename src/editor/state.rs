use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{EditError, Level};
use crate::models::{KeyValuePair, Page, Step};

macro_rules! node_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Uuid);

        impl $name {
            fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }
    };
}

node_id!(PageId);
node_id!(StepId);
node_id!(PairId);
node_id!(VariableId);

/// One row of the variables table while editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variable {
    pub key: String,
    pub value: String,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Default)]
struct PageNode {
    url: String,
    steps: Vec<StepId>,
}

#[derive(Debug, Clone, Default)]
struct StepNode {
    action: String,
    location: String,
    variable: Option<String>,
    pairs: Vec<PairId>,
}

/// Expanded task tree owned by an open editor.
///
/// Entities live in per-level arenas keyed by generated ids; each level keeps
/// an explicit order list. Ids stay valid across removals of their siblings,
/// so a handle taken before a delete still addresses the same entity after it.
/// Index-based access is a view over the order lists.
#[derive(Debug, Clone, Default)]
pub struct EditState {
    page_order: Vec<PageId>,
    pages: HashMap<PageId, PageNode>,
    steps: HashMap<StepId, StepNode>,
    pairs: HashMap<PairId, KeyValuePair>,
    variable_order: Vec<VariableId>,
    variables: HashMap<VariableId, Variable>,
}

impl EditState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- index → id resolution ----

    pub fn page_id(&self, index: usize) -> Result<PageId, EditError> {
        lookup(&self.page_order, index, Level::Page)
    }

    pub fn step_id(&self, page: usize, step: usize) -> Result<StepId, EditError> {
        let page = self.page_id(page)?;
        lookup(self.step_ids(page), step, Level::Step)
    }

    pub fn pair_id(&self, page: usize, step: usize, pair: usize) -> Result<PairId, EditError> {
        let step = self.step_id(page, step)?;
        lookup(self.pair_ids(step), pair, Level::Pair)
    }

    pub fn variable_id(&self, index: usize) -> Result<VariableId, EditError> {
        lookup(&self.variable_order, index, Level::Variable)
    }

    pub fn page_ids(&self) -> &[PageId] {
        &self.page_order
    }

    pub fn step_ids(&self, page: PageId) -> &[StepId] {
        self.pages.get(&page).map(|p| p.steps.as_slice()).unwrap_or_default()
    }

    pub fn pair_ids(&self, step: StepId) -> &[PairId] {
        self.steps.get(&step).map(|s| s.pairs.as_slice()).unwrap_or_default()
    }

    pub fn variable_ids(&self) -> &[VariableId] {
        &self.variable_order
    }

    // ---- id-addressed mutations ----

    pub fn add_page(&mut self) -> PageId {
        let id = PageId::generate();
        self.pages.insert(id, PageNode::default());
        self.page_order.push(id);
        id
    }

    pub fn remove_page(&mut self, id: PageId) -> bool {
        let Some(node) = self.pages.remove(&id) else {
            return false;
        };
        self.page_order.retain(|p| *p != id);
        for step in node.steps {
            self.drop_step(step);
        }
        true
    }

    pub fn set_page_url(&mut self, id: PageId, url: impl Into<String>) -> bool {
        match self.pages.get_mut(&id) {
            Some(node) => {
                node.url = url.into();
                true
            }
            None => false,
        }
    }

    pub fn add_step(&mut self, page: PageId) -> Option<StepId> {
        let node = self.pages.get_mut(&page)?;
        let id = StepId::generate();
        node.steps.push(id);
        self.steps.insert(id, StepNode::default());
        Some(id)
    }

    pub fn remove_step(&mut self, page: PageId, step: StepId) -> bool {
        let Some(node) = self.pages.get_mut(&page) else {
            return false;
        };
        let before = node.steps.len();
        node.steps.retain(|s| *s != step);
        if node.steps.len() == before {
            return false;
        }
        self.drop_step(step);
        true
    }

    pub fn set_action(&mut self, step: StepId, action: impl Into<String>) -> bool {
        self.with_step(step, |s| s.action = action.into())
    }

    pub fn set_location(&mut self, step: StepId, location: impl Into<String>) -> bool {
        self.with_step(step, |s| s.location = location.into())
    }

    /// An empty name clears the captured variable.
    pub fn set_variable(&mut self, step: StepId, variable: impl Into<String>) -> bool {
        let variable = variable.into();
        self.with_step(step, |s| {
            s.variable = if variable.is_empty() { None } else { Some(variable) };
        })
    }

    pub fn add_pair(&mut self, step: StepId) -> Option<PairId> {
        let node = self.steps.get_mut(&step)?;
        let id = PairId::generate();
        node.pairs.push(id);
        self.pairs.insert(id, KeyValuePair::default());
        Some(id)
    }

    pub fn remove_pair(&mut self, step: StepId, pair: PairId) -> bool {
        let Some(node) = self.steps.get_mut(&step) else {
            return false;
        };
        let before = node.pairs.len();
        node.pairs.retain(|p| *p != pair);
        if node.pairs.len() == before {
            return false;
        }
        self.pairs.remove(&pair);
        true
    }

    pub fn set_pair_key(&mut self, pair: PairId, key: impl Into<String>) -> bool {
        match self.pairs.get_mut(&pair) {
            Some(p) => {
                p.key = key.into();
                true
            }
            None => false,
        }
    }

    pub fn set_pair_value(&mut self, pair: PairId, value: impl Into<String>) -> bool {
        match self.pairs.get_mut(&pair) {
            Some(p) => {
                p.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn add_variable(&mut self) -> VariableId {
        let id = VariableId::generate();
        self.variables.insert(id, Variable::default());
        self.variable_order.push(id);
        id
    }

    pub fn remove_variable(&mut self, id: VariableId) -> bool {
        if self.variables.remove(&id).is_none() {
            return false;
        }
        self.variable_order.retain(|v| *v != id);
        true
    }

    pub fn set_variable_key(&mut self, id: VariableId, key: impl Into<String>) -> bool {
        match self.variables.get_mut(&id) {
            Some(v) => {
                v.key = key.into();
                true
            }
            None => false,
        }
    }

    pub fn set_variable_value(&mut self, id: VariableId, value: impl Into<String>) -> bool {
        match self.variables.get_mut(&id) {
            Some(v) => {
                v.value = value.into();
                true
            }
            None => false,
        }
    }

    // ---- materialized views ----

    pub fn page_count(&self) -> usize {
        self.page_order.len()
    }

    pub fn page(&self, id: PageId) -> Option<Page> {
        let node = self.pages.get(&id)?;
        Some(Page {
            url: node.url.clone(),
            steps: node.steps.iter().filter_map(|s| self.step(*s)).collect(),
        })
    }

    pub fn step(&self, id: StepId) -> Option<Step> {
        let node = self.steps.get(&id)?;
        Some(Step {
            action: node.action.clone(),
            location: node.location.clone(),
            variable: node.variable.clone(),
            key_value_pairs: node.pairs.iter().filter_map(|p| self.pairs.get(p).cloned()).collect(),
        })
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(&id)
    }

    /// Pages in order, as they will be persisted.
    pub fn pages(&self) -> Vec<Page> {
        self.page_order.iter().filter_map(|p| self.page(*p)).collect()
    }

    /// Variable rows in display order.
    pub fn variables(&self) -> Vec<Variable> {
        self.variable_order
            .iter()
            .filter_map(|v| self.variables.get(v).cloned())
            .collect()
    }

    // ---- bulk construction (used by the codec) ----

    /// Append a persisted page. A step with a non-empty captured variable and
    /// no pairs gets one `{variable: variable}` pair for display. An empty
    /// variable is dropped, as `set_variable` does.
    pub(crate) fn push_page(&mut self, page: &Page) -> PageId {
        let page_id = self.add_page();
        self.set_page_url(page_id, page.url.clone());
        for step in &page.steps {
            let step_id = StepId::generate();
            let variable = step.variable.clone().filter(|v| !v.is_empty());
            let pairs: Vec<KeyValuePair> = match (&variable, step.key_value_pairs.is_empty()) {
                (Some(var), true) => vec![KeyValuePair::new(var.clone(), var.clone())],
                _ => step.key_value_pairs.clone(),
            };
            let mut node = StepNode {
                action: step.action.clone(),
                location: step.location.clone(),
                variable,
                pairs: Vec::with_capacity(pairs.len()),
            };
            for pair in pairs {
                let pair_id = PairId::generate();
                self.pairs.insert(pair_id, pair);
                node.pairs.push(pair_id);
            }
            self.steps.insert(step_id, node);
            if let Some(p) = self.pages.get_mut(&page_id) {
                p.steps.push(step_id);
            }
        }
        page_id
    }

    pub(crate) fn push_variable(&mut self, key: &str, value: &str) -> VariableId {
        let id = self.add_variable();
        self.variables.insert(id, Variable::new(key, value));
        id
    }

    fn with_step(&mut self, id: StepId, f: impl FnOnce(&mut StepNode)) -> bool {
        match self.steps.get_mut(&id) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }

    fn drop_step(&mut self, id: StepId) {
        if let Some(node) = self.steps.remove(&id) {
            for pair in node.pairs {
                self.pairs.remove(&pair);
            }
        }
    }
}

fn lookup<T: Copy>(order: &[T], index: usize, level: Level) -> Result<T, EditError> {
    order
        .get(index)
        .copied()
        .ok_or(EditError::IndexOutOfRange { level, index, len: order.len() })
}

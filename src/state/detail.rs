// Detail view state.
// Cursor over the followable references of the focused record.

use ratatui::widgets::ListState;

use crate::swapi::{Address, Record, display_fields};

use super::browse::step;

#[derive(Debug, Clone, Default)]
pub struct DetailState {
    pub list_state: ListState,
    address: Option<Address>,
    targets: Vec<Address>,
}

impl DetailState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the cursor at `record`'s references. Selection survives updates of
    /// the same record and resets when the record changes.
    pub fn update(&mut self, record: Option<&Record>) {
        let Some(record) = record else {
            self.address = None;
            self.targets.clear();
            self.list_state.select(None);
            return;
        };
        if self.address.as_ref() == Some(record.address()) {
            return;
        }
        self.address = Some(record.address().clone());
        self.targets = display_fields(record)
            .iter()
            .flat_map(|field| field.targets().iter().cloned())
            .collect();
        self.list_state
            .select((!self.targets.is_empty()).then_some(0));
    }

    pub fn targets(&self) -> &[Address] {
        &self.targets
    }

    pub fn select_next(&mut self) {
        step(&mut self.list_state, self.targets.len(), 1);
    }

    pub fn select_prev(&mut self) {
        step(&mut self.list_state, self.targets.len(), -1);
    }

    pub fn selected_target(&self) -> Option<&Address> {
        self.targets.get(self.list_state.selected()?)
    }

    /// Drop the cursor so the next `update` starts at the top.
    pub fn clear(&mut self) {
        self.update(None);
    }
}

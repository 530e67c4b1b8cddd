use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::ViewError;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub visible: bool,
    /// Left-to-right position, dense and 0-based across all known columns.
    pub order: usize,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            visible: true,
            order: 0,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Ordered, visibility-tagged list of the fields a view exposes.
///
/// Columns are kept in display order and `order` is rewritten after every
/// change, so it always is a permutation of `0..len`. Hidden columns keep
/// their slot.
#[derive(Debug, Clone)]
pub struct ColumnModel {
    columns: Vec<Column>,
    baseline: Vec<(String, bool)>,
}

impl ColumnModel {
    pub fn new(columns: Vec<Column>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(columns.len());
        for column in columns {
            if seen.insert(column.key.clone()) {
                unique.push(column);
            } else {
                warn!("Dropping duplicate column {:?}", column.key);
            }
        }
        if !unique.is_empty() && unique.iter().all(|c| !c.visible) {
            unique[0].visible = true;
        }

        let mut model = Self {
            columns: unique,
            baseline: Vec::new(),
        };
        model.renumber();
        model.baseline = model
            .columns
            .iter()
            .map(|c| (c.key.clone(), c.visible))
            .collect();
        model
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// All columns, hidden ones included, in display order.
    pub fn ordered(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter()
    }

    /// Keys of the visible columns in ascending order.
    pub fn visible_ordered(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.columns
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.key.as_str())
    }

    pub fn visible_count(&self) -> usize {
        self.columns.iter().filter(|c| c.visible).count()
    }

    /// Moves `moved` so it sits immediately before `target`.
    ///
    /// The moved column is taken out first and the target's index is then
    /// looked up in the shrunk list, which gives the same result whether the
    /// move goes left or right.
    pub fn reorder(&mut self, moved: &str, target: &str) -> Result<(), ViewError> {
        let from = self.position_or_err(moved)?;
        let to = self.position_or_err(target)?;
        if from == to {
            return Ok(());
        }
        let column = self.columns.remove(from);
        let to = if to > from { to - 1 } else { to };
        self.columns.insert(to, column);
        self.renumber();
        debug!("Moved column {moved:?} before {target:?}");
        Ok(())
    }

    pub fn set_visible(&mut self, key: &str, visible: bool) -> Result<(), ViewError> {
        let idx = self.position_or_err(key)?;
        if !visible && self.columns[idx].visible && self.visible_count() == 1 {
            return Err(ViewError::LastColumn);
        }
        self.columns[idx].visible = visible;
        Ok(())
    }

    pub fn toggle_visible(&mut self, key: &str) -> Result<(), ViewError> {
        let idx = self.position_or_err(key)?;
        let visible = self.columns[idx].visible;
        self.set_visible(key, !visible)
    }

    pub fn show_all(&mut self) {
        for column in self.columns.iter_mut() {
            column.visible = true;
        }
    }

    /// Restores the order and visibility the model was built with.
    pub fn reset_to_default(&mut self) {
        let mut restored = Vec::with_capacity(self.columns.len());
        for (key, visible) in self.baseline.iter() {
            if let Some(idx) = self.position(key) {
                let mut column = self.columns.remove(idx);
                column.visible = *visible;
                restored.push(column);
            }
        }
        // Columns that joined after construction go to the end.
        restored.append(&mut self.columns);
        self.columns = restored;
        self.renumber();
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    fn position_or_err(&self, key: &str) -> Result<usize, ViewError> {
        self.position(key).ok_or_else(|| ViewError::UnknownColumnKey {
            key: key.to_string(),
        })
    }

    fn renumber(&mut self) {
        for (idx, column) in self.columns.iter_mut().enumerate() {
            column.order = idx;
        }
    }
}

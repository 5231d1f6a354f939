use std::cell::RefCell;
use std::collections::VecDeque;

use crate::operation::{ApplyError, ChangeConsumer, Operation};

/// Undo history configuration.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of undoable operations kept. `0` keeps everything.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

/// Why a property changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Executed,
    Undone,
    Redone,
}

/// Record of one successful mutation, drained by the host to refresh panels.
#[derive(Debug, Clone)]
pub struct PropertyChange<O> {
    pub target: O,
    pub property: String,
    pub cause: ChangeCause,
}

/// Linear undo/redo history for one editing session.
///
/// Executes operations, keeps them on the undo stack and records a
/// [`PropertyChange`] for every mutation so controls bound elsewhere can
/// reload. Interior mutability lets every control of a session share it
/// through `Rc<dyn ChangeConsumer<O>>`.
pub struct EditHistory<O> {
    config: HistoryConfig,
    root: RefCell<Option<O>>,
    undo_stack: RefCell<VecDeque<Operation<O>>>,
    redo_stack: RefCell<Vec<Operation<O>>>,
    changes: RefCell<Vec<PropertyChange<O>>>,
}

impl<O: Clone> EditHistory<O> {
    /// Create an empty history with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            root: RefCell::new(None),
            undo_stack: RefCell::new(VecDeque::new()),
            redo_stack: RefCell::new(Vec::new()),
            changes: RefCell::new(Vec::new()),
        }
    }

    /// Set the session's root model.
    pub fn with_root(self, root: O) -> Self {
        self.set_root(Some(root));
        self
    }

    pub fn set_root(&self, root: Option<O>) {
        *self.root.borrow_mut() = root;
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Number of operations on the undo stack.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.borrow().len()
    }

    /// Number of operations on the redo stack.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.borrow().len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.borrow().is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.borrow().is_empty()
    }

    /// Description of the operation `undo()` would revert.
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.borrow().back().map(Operation::description)
    }

    /// Description of the operation `redo()` would re-apply.
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.borrow().last().map(Operation::description)
    }

    /// Drain and return the recorded property changes.
    pub fn drain_changes(&self) -> Vec<PropertyChange<O>> {
        std::mem::take(&mut *self.changes.borrow_mut())
    }

    /// Forget all history. Called when the editing session closes.
    pub fn clear(&self) {
        self.undo_stack.borrow_mut().clear();
        self.redo_stack.borrow_mut().clear();
        self.changes.borrow_mut().clear();
        self.set_root(None);
    }

    fn record(&self, operation: &Operation<O>, cause: ChangeCause) {
        self.changes.borrow_mut().push(PropertyChange {
            target: operation.target().clone(),
            property: operation.property().to_string(),
            cause,
        });
    }

    fn push_undo(&self, operation: Operation<O>) {
        let mut stack = self.undo_stack.borrow_mut();
        stack.push_back(operation);
        if self.config.capacity > 0 {
            while stack.len() > self.config.capacity {
                if let Some(evicted) = stack.pop_front() {
                    tracing::debug!(
                        "history full, dropping oldest edit `{}`",
                        evicted.description()
                    );
                }
            }
        }
    }
}

impl<O: Clone> Default for EditHistory<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Clone> ChangeConsumer<O> for EditHistory<O> {
    fn execute(&self, operation: Operation<O>) -> Result<(), ApplyError> {
        // The mutator runs before any borrow is taken so it may read the history.
        operation.apply()?;
        tracing::debug!("executed {}", operation.description());
        self.record(&operation, ChangeCause::Executed);
        self.push_undo(operation);
        self.redo_stack.borrow_mut().clear();
        Ok(())
    }

    fn undo(&self) -> Result<bool, ApplyError> {
        let Some(operation) = self.undo_stack.borrow_mut().pop_back() else {
            tracing::debug!("nothing to undo");
            return Ok(false);
        };
        if let Err(err) = operation.revert() {
            self.undo_stack.borrow_mut().push_back(operation);
            return Err(err);
        }
        tracing::debug!("undid {}", operation.description());
        self.record(&operation, ChangeCause::Undone);
        self.redo_stack.borrow_mut().push(operation);
        Ok(true)
    }

    fn redo(&self) -> Result<bool, ApplyError> {
        let Some(operation) = self.redo_stack.borrow_mut().pop() else {
            tracing::debug!("nothing to redo");
            return Ok(false);
        };
        if let Err(err) = operation.apply() {
            self.redo_stack.borrow_mut().push(operation);
            return Err(err);
        }
        tracing::debug!("redid {}", operation.description());
        self.record(&operation, ChangeCause::Redone);
        self.undo_stack.borrow_mut().push_back(operation);
        Ok(true)
    }

    fn current_model(&self) -> Option<O> {
        self.root.borrow().clone()
    }
}

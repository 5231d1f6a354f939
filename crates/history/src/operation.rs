use propkit_common::{PropertyValue, ValueKind};
use std::fmt;
use std::rc::Rc;

/// Writes a value into one property of a target object.
///
/// The same mutator applies the new value on execute/redo and the old value
/// on undo.
pub type Mutator<O> = Rc<dyn Fn(&O, &PropertyValue) -> Result<(), ApplyError>>;

/// Errors raised while writing a value into a domain object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplyError {
    #[error("property `{property}` rejected the value: {reason}")]
    Rejected { property: String, reason: String },
    #[error("target object no longer exists")]
    TargetMissing,
    #[error("property `{property}` expects a {expected} value, got {found}")]
    KindMismatch {
        property: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

impl ApplyError {
    pub fn rejected(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

/// An immutable, reversible edit of one property on one object.
pub struct Operation<O> {
    target: O,
    property: String,
    old_value: PropertyValue,
    new_value: PropertyValue,
    mutator: Mutator<O>,
}

impl<O> Operation<O> {
    pub fn new(
        target: O,
        property: impl Into<String>,
        new_value: PropertyValue,
        old_value: PropertyValue,
        mutator: Mutator<O>,
    ) -> Self {
        Self {
            target,
            property: property.into(),
            old_value,
            new_value,
            mutator,
        }
    }

    pub fn target(&self) -> &O {
        &self.target
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn old_value(&self) -> &PropertyValue {
        &self.old_value
    }

    pub fn new_value(&self) -> &PropertyValue {
        &self.new_value
    }

    /// Human-readable summary for undo/redo menus.
    pub fn description(&self) -> String {
        format!("{}: {} -> {}", self.property, self.old_value, self.new_value)
    }

    /// Write the new value into the target.
    pub fn apply(&self) -> Result<(), ApplyError> {
        (self.mutator)(&self.target, &self.new_value)
    }

    /// Write the old value back into the target.
    pub fn revert(&self) -> Result<(), ApplyError> {
        (self.mutator)(&self.target, &self.old_value)
    }
}

impl<O: fmt::Debug> fmt::Debug for Operation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("target", &self.target)
            .field("property", &self.property)
            .field("old_value", &self.old_value)
            .field("new_value", &self.new_value)
            .finish_non_exhaustive()
    }
}

/// Host-supplied sink that executes operations and keeps their history.
///
/// All methods take `&self`: controls share one consumer per editing
/// session and everything runs on the UI thread. Implementations that hand
/// mutations to another thread do so inside `execute`.
pub trait ChangeConsumer<O> {
    /// Apply the operation and record it. A failing mutator leaves the
    /// history untouched and its error is returned to the caller.
    fn execute(&self, operation: Operation<O>) -> Result<(), ApplyError>;

    /// Revert the most recent operation. `Ok(false)` when there is nothing to undo.
    fn undo(&self) -> Result<bool, ApplyError>;

    /// Re-apply the most recently undone operation. `Ok(false)` when there is nothing to redo.
    fn redo(&self) -> Result<bool, ApplyError>;

    /// Root object of the session, for builders that need global context.
    fn current_model(&self) -> Option<O>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn cell_mutator() -> Mutator<Rc<Cell<i64>>> {
        Rc::new(|target: &Rc<Cell<i64>>, value: &PropertyValue| match value {
            PropertyValue::Int(v) => {
                target.set(*v);
                Ok(())
            }
            other => Err(ApplyError::KindMismatch {
                property: "count".into(),
                expected: ValueKind::Int,
                found: other.kind(),
            }),
        })
    }

    #[test]
    fn apply_and_revert_use_the_same_mutator() {
        let target = Rc::new(Cell::new(5));
        let op = Operation::new(
            target.clone(),
            "count",
            PropertyValue::Int(7),
            PropertyValue::Int(5),
            cell_mutator(),
        );
        op.apply().unwrap();
        assert_eq!(target.get(), 7);
        op.revert().unwrap();
        assert_eq!(target.get(), 5);
    }

    #[test]
    fn description_names_both_values() {
        let op = Operation::new(
            Rc::new(Cell::new(0)),
            "count",
            PropertyValue::Int(2),
            PropertyValue::Int(1),
            cell_mutator(),
        );
        assert_eq!(op.description(), "count: 1 -> 2");
        assert!(format!("{op:?}").contains("count"));
    }

    #[test]
    fn mutator_errors_surface() {
        let op = Operation::new(
            Rc::new(Cell::new(0)),
            "count",
            PropertyValue::Bool(true),
            PropertyValue::Int(0),
            cell_mutator(),
        );
        assert!(matches!(op.apply(), Err(ApplyError::KindMismatch { .. })));
    }
}

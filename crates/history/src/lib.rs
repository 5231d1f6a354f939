//! Edit history: reversible property operations and the change consumer that
//! executes them.
//!
//! # Invariants
//! - Every successful edit is reversible; undo replays the old value through
//!   the same mutator that applied the new one.
//! - A failed mutation never enters the history.
//! - Executing a new operation clears the redo stack.

mod history;
mod operation;

pub use history::{ChangeCause, EditHistory, HistoryConfig, PropertyChange};
pub use operation::{ApplyError, ChangeConsumer, Mutator, Operation};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}

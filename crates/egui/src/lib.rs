//! egui rendering for propkit panels.
//!
//! [`EguiField`] implements the control widget hooks by sharing a
//! [`FieldState`] with [`EguiPanel`], which draws every field each frame and
//! feeds user input back through the owning control.
//!
//! # Invariants
//! - Fields and controls are appended together, so field `i` belongs to
//!   control `i`.
//! - Input is submitted after drawing, never while a field state is borrowed.

mod field;
mod panel;

pub use field::{EguiField, FieldInput, FieldState};
pub use panel::{EguiPanel, FieldError, history_toolbar};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}

//! Property controls: one editable widget bound to one property of one object.
//!
//! A [`Property`] pairs a name and value kind with accessor functions. A
//! [`PropertyControl`] binds a property to an object and runs the
//! Clean → Dirty → Clean lifecycle, committing edits through a
//! [`ChangeConsumer`](propkit_history::ChangeConsumer) so they can be undone.
//!
//! # Invariants
//! - Accessors always produce and accept the property's declared kind;
//!   violations are reported when the control is bound.
//! - Enum properties carry a non-empty domain; edits outside it are rejected.
//! - `is_dirty()` is exactly `transient != last_synced`.
//! - Validation failures never reach the change consumer.

mod control;
mod error;
mod property;
mod widget;

pub use control::{ControlDescriptor, PropertyControl};
pub use error::{ControlError, ValidationError};
pub use property::{NumericRange, Property, PropertyOptions};
pub use widget::{ControlWidget, HeadlessWidget, ReferenceCandidate, ReferenceChooser, Selection};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}

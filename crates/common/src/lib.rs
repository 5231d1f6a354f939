//! Shared value model: object identity, colors and the closed set of editable
//! property values.
//!
//! # Invariants
//! - Every editable value belongs to exactly one `ValueKind`.
//! - Value equality is exact (no epsilon) for every kind.

mod types;
mod value;

pub use types::{Color, ObjectId};
pub use value::{EditableEnum, EditableValue, ParseValueError, PropertyValue, ValueKind};

//! Builder dispatch: turn an arbitrary object into an ordered panel of
//! property controls.
//!
//! # Invariants
//! - Every builder whose predicate holds runs, in registration order; there
//!   is no first-match shortcut.
//! - Predicates are pure; dispatching twice on an unchanged object yields the
//!   same controls in the same order.

mod panel;
mod registry;

pub use panel::{Container, ControlSnapshot, PanelGroup, PropertyPanel};
pub use registry::{Builder, BuilderRegistry, FnBuilder};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}

use propkit_common::{ObjectId, PropertyValue};

use crate::control::ControlDescriptor;

/// Toolkit hooks for the widget behind a [`PropertyControl`](crate::PropertyControl).
///
/// The control owns the sync/dirty/apply state machine; a toolkit only
/// displays values and hands back input. Implemented once per UI toolkit.
pub trait ControlWidget {
    /// Build the widget for a freshly attached control.
    fn create(&mut self, descriptor: &ControlDescriptor) {
        let _ = descriptor;
    }

    /// Show `value`. Called on reload and whenever input is reverted or clamped.
    fn reload(&mut self, value: &PropertyValue);

    /// Pending input a retained-mode toolkit has not reported yet.
    ///
    /// Polled at the start of every `apply()`.
    fn apply(&mut self) -> Option<PropertyValue> {
        None
    }

    /// Release toolkit resources. The control is being torn down.
    fn dispose(&mut self) {}
}

/// Widget used until a toolkit attaches its own: remembers what it shows.
#[derive(Debug, Default)]
pub struct HeadlessWidget {
    shown: Option<PropertyValue>,
}

impl HeadlessWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Option<&PropertyValue> {
        self.shown.as_ref()
    }
}

impl ControlWidget for HeadlessWidget {
    fn reload(&mut self, value: &PropertyValue) {
        self.shown = Some(value.clone());
    }
}

/// An object a reference property can point at.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCandidate {
    pub id: ObjectId,
    pub label: String,
}

/// Outcome of a selection dialog.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The user picked a value; `None` clears the reference.
    Chosen(Option<ObjectId>),
    Cancelled,
}

/// Selection dialog for reference-typed properties, opaque to the control.
pub trait ReferenceChooser {
    fn choose(&mut self, current: Option<ObjectId>) -> Selection;
}

impl<F> ReferenceChooser for F
where
    F: FnMut(Option<ObjectId>) -> Selection,
{
    fn choose(&mut self, current: Option<ObjectId>) -> Selection {
        self(current)
    }
}

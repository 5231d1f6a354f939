use propkit_common::{PropertyValue, ValueKind};
use propkit_history::{ApplyError, PropertyChange};
use propkit_property::{ControlError, PropertyControl, PropertyOptions};
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Receives the controls builders construct, in order.
pub trait Container<O> {
    fn append(&mut self, control: PropertyControl<O>);

    /// Start the group of controls contributed by the next builder.
    fn begin_group(&mut self, title: &str) {
        let _ = title;
    }
}

/// A titled run of consecutive controls contributed by one builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelGroup {
    pub title: String,
    pub range: Range<usize>,
}

/// Default container: an ordered list of controls split into groups.
///
/// Dropping the panel drops its controls, which disposes their widgets.
pub struct PropertyPanel<O> {
    controls: Vec<PropertyControl<O>>,
    groups: Vec<PanelGroup>,
}

impl<O> PropertyPanel<O> {
    pub fn new() -> Self {
        Self {
            controls: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn controls(&self) -> &[PropertyControl<O>] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut [PropertyControl<O>] {
        &mut self.controls
    }

    /// Property names in display order.
    pub fn names(&self) -> Vec<&str> {
        self.controls.iter().map(PropertyControl::name).collect()
    }

    pub fn control(&self, name: &str) -> Option<&PropertyControl<O>> {
        self.controls.iter().find(|c| c.name() == name)
    }

    pub fn control_mut(&mut self, name: &str) -> Option<&mut PropertyControl<O>> {
        self.controls.iter_mut().find(|c| c.name() == name)
    }

    /// Non-empty groups in display order.
    pub fn groups(&self) -> impl Iterator<Item = &PanelGroup> {
        self.groups.iter().filter(|g| !g.range.is_empty())
    }

    /// Title of the group holding the control at `index`.
    pub fn group_of(&self, index: usize) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.range.contains(&index))
            .map(|g| g.title.as_str())
    }

    /// Plain-data view of every control, for printing or serialization.
    pub fn snapshot(&self) -> Vec<ControlSnapshot> {
        self.controls
            .iter()
            .enumerate()
            .map(|(i, control)| ControlSnapshot {
                group: self.group_of(i).unwrap_or_default().to_string(),
                name: control.name().to_string(),
                kind: control.kind(),
                value: control.transient().clone(),
                dirty: control.is_dirty(),
                options: control.options().clone(),
            })
            .collect()
    }
}

impl<O: Clone + 'static> PropertyPanel<O> {
    /// Reload every control from its object. Keeps going past a control
    /// that cannot reload and returns the first error.
    pub fn reload_all(&mut self) -> Result<(), ControlError> {
        let mut first_error = None;
        for control in &mut self.controls {
            if let Err(err) = control.reload() {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Commit every dirty control. Keeps going past a rejected control and
    /// returns the first error after all controls have been tried.
    pub fn apply_all(&mut self) -> Result<usize, ApplyError> {
        let mut committed = 0;
        let mut first_error = None;
        for control in &mut self.controls {
            match control.apply() {
                Ok(true) => committed += 1,
                Ok(false) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(committed),
        }
    }
}

impl<O: Clone + PartialEq + 'static> PropertyPanel<O> {
    /// Reload the controls bound to changed properties. Returns how many reloaded.
    pub fn sync_changes(&mut self, changes: &[PropertyChange<O>]) -> usize {
        let mut reloaded = 0;
        for control in &mut self.controls {
            let affected = changes
                .iter()
                .any(|c| c.property == control.name() && &c.target == control.object());
            if affected && control.reload().is_ok() {
                reloaded += 1;
            }
        }
        reloaded
    }
}

impl<O> Default for PropertyPanel<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Container<O> for PropertyPanel<O> {
    fn append(&mut self, control: PropertyControl<O>) {
        if self.control(control.name()).is_some() {
            tracing::warn!("panel already has a `{}` control", control.name());
        }
        let index = self.controls.len();
        match self.groups.last_mut() {
            Some(group) => group.range.end = index + 1,
            None => self.groups.push(PanelGroup {
                title: String::new(),
                range: index..index + 1,
            }),
        }
        self.controls.push(control);
    }

    fn begin_group(&mut self, title: &str) {
        let start = self.controls.len();
        match self.groups.last_mut() {
            // The previous builder contributed nothing; reuse its slot.
            Some(group) if group.range.is_empty() => group.title = title.to_string(),
            _ => self.groups.push(PanelGroup {
                title: title.to_string(),
                range: start..start,
            }),
        }
    }
}

/// One control's state as plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSnapshot {
    pub group: String,
    pub name: String,
    pub kind: ValueKind,
    pub value: PropertyValue,
    pub dirty: bool,
    pub options: PropertyOptions,
}

impl fmt::Display for ControlSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<14} {:<9} {}", self.name, self.kind, self.value)?;
        if self.options.read_only {
            f.write_str(" (read-only)")?;
        }
        if self.dirty {
            f.write_str(" *")?;
        }
        Ok(())
    }
}

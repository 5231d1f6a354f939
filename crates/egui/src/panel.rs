use propkit_builder::{BuilderRegistry, Container, PanelGroup, PropertyPanel};
use propkit_history::{ApplyError, ChangeConsumer, EditHistory};
use propkit_property::{ControlError, PropertyControl, ValidationError};
use std::cell::RefCell;
use std::rc::Rc;

use crate::field::{EguiField, FieldInput, FieldState, draw_field};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Rejected(#[from] ApplyError),
}

/// A [`PropertyPanel`] whose controls draw themselves with egui.
pub struct EguiPanel<O> {
    panel: PropertyPanel<O>,
    fields: Vec<Rc<RefCell<FieldState>>>,
}

impl<O: Clone + 'static> EguiPanel<O> {
    pub fn new() -> Self {
        Self {
            panel: PropertyPanel::new(),
            fields: Vec::new(),
        }
    }

    /// Dispatch `registry` on `object` into a fresh panel.
    pub fn build(
        registry: &BuilderRegistry<O>,
        object: &O,
        parent: Option<&O>,
        consumer: &Rc<dyn ChangeConsumer<O>>,
    ) -> Result<Self, ControlError> {
        let mut panel = Self::new();
        registry.dispatch(object, parent, &mut panel, consumer)?;
        Ok(panel)
    }

    pub fn panel(&self) -> &PropertyPanel<O> {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut PropertyPanel<O> {
        &mut self.panel
    }

    /// Shared state of the field bound to `name`.
    pub fn field(&self, name: &str) -> Option<&Rc<RefCell<FieldState>>> {
        let index = self.index_of(name)?;
        self.fields.get(index)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.panel.controls().iter().position(|c| c.name() == name)
    }

    /// Draw every group and submit whatever the user changed this frame.
    /// Returns how many edits were committed.
    pub fn show(&mut self, ui: &mut egui::Ui) -> usize {
        let groups: Vec<PanelGroup> = self.panel.groups().cloned().collect();
        let mut inputs = Vec::new();
        for (n, group) in groups.iter().enumerate() {
            let title = if group.title.is_empty() {
                "Properties"
            } else {
                group.title.as_str()
            };
            egui::CollapsingHeader::new(title)
                .id_salt(n)
                .default_open(true)
                .show(ui, |ui| {
                    egui::Grid::new(("propkit-group", n))
                        .num_columns(3)
                        .striped(true)
                        .show(ui, |ui| {
                            for index in group.range.clone() {
                                if let Some(input) = self.draw_row(ui, index) {
                                    inputs.push((index, input));
                                }
                            }
                        });
                });
        }

        let mut committed = 0;
        for (index, input) in inputs {
            if let Ok(true) = self.submit_at(index, input) {
                committed += 1;
            }
        }
        committed
    }

    fn draw_row(&self, ui: &mut egui::Ui, index: usize) -> Option<FieldInput> {
        let control = self.panel.controls().get(index)?;
        let state = self.fields.get(index)?;

        let label = if control.is_dirty() {
            format!("{} *", control.name())
        } else {
            control.name().to_string()
        };
        ui.label(label).on_hover_text(control.kind().name());
        let input = ui
            .push_id(index, |ui| {
                draw_field(ui, &mut state.borrow_mut(), control.has_chooser())
            })
            .inner;
        let error = state.borrow().error.clone();
        match error {
            Some(error) => {
                let color = ui.visuals().error_fg_color;
                ui.colored_label(color, error);
            }
            None => {
                ui.label("");
            }
        }
        ui.end_row();
        input
    }

    /// Feed `input` to the control bound to `name` and commit it.
    pub fn submit(&mut self, name: &str, input: FieldInput) -> Result<bool, FieldError> {
        match self.index_of(name) {
            Some(index) => self.submit_at(index, input),
            None => {
                tracing::warn!("no `{name}` field to submit to");
                Ok(false)
            }
        }
    }

    fn submit_at(&mut self, index: usize, input: FieldInput) -> Result<bool, FieldError> {
        let Some(control) = self.panel.controls_mut().get_mut(index) else {
            return Ok(false);
        };
        let outcome = commit(control, input);
        if let (Err(err), Some(state)) = (&outcome, self.fields.get(index)) {
            tracing::debug!("field {index} not committed: {err}");
            state.borrow_mut().error = Some(err.to_string());
        }
        outcome
    }
}

fn commit<O: Clone + 'static>(
    control: &mut PropertyControl<O>,
    input: FieldInput,
) -> Result<bool, FieldError> {
    match input {
        FieldInput::Value(value) => control.edit(value)?,
        FieldInput::Text(text) => control.edit_text(&text)?,
        FieldInput::Choose => return Ok(control.choose_reference()?),
    }
    Ok(control.apply()?)
}

impl<O: Clone + 'static> Default for EguiPanel<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Clone + 'static> Container<O> for EguiPanel<O> {
    fn append(&mut self, mut control: PropertyControl<O>) {
        let state = Rc::new(RefCell::new(FieldState::default()));
        control.attach_widget(Box::new(EguiField::new(state.clone())));
        self.fields.push(state);
        self.panel.append(control);
    }

    fn begin_group(&mut self, title: &str) {
        self.panel.begin_group(title);
    }
}

/// Undo and redo buttons for `history`. Returns whether anything changed.
pub fn history_toolbar<O: Clone>(
    ui: &mut egui::Ui,
    history: &EditHistory<O>,
) -> Result<bool, ApplyError> {
    ui.horizontal(|ui| {
        let undo = ui.add_enabled(history.can_undo(), egui::Button::new("Undo"));
        let undo = match history.undo_description() {
            Some(text) => undo.on_hover_text(text),
            None => undo,
        };
        let redo = ui.add_enabled(history.can_redo(), egui::Button::new("Redo"));
        let redo = match history.redo_description() {
            Some(text) => redo.on_hover_text(text),
            None => redo,
        };
        if undo.clicked() {
            return history.undo();
        }
        if redo.clicked() {
            return history.redo();
        }
        Ok(false)
    })
    .inner
}

use propkit_common::{Color, PropertyValue};
use propkit_property::{ControlDescriptor, ControlWidget, NumericRange};
use std::cell::RefCell;
use std::rc::Rc;

/// What one field shows, shared between its widget and the panel drawing it.
#[derive(Debug, Clone, Default)]
pub struct FieldState {
    pub descriptor: Option<ControlDescriptor>,
    /// Last value the control pushed.
    pub shown: Option<PropertyValue>,
    /// Value being edited in the widget.
    pub buffer: Option<PropertyValue>,
    /// Text buffer for kinds edited as text.
    pub text: String,
    /// Input the panel has not submitted yet; polled by `apply()`.
    pub pending: Option<PropertyValue>,
    /// Why the last submission failed.
    pub error: Option<String>,
    pub disposed: bool,
}

/// User input collected while drawing a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Value(PropertyValue),
    /// Typed text, parsed by the control.
    Text(String),
    /// The reference chooser was requested.
    Choose,
}

/// Control widget backed by egui.
#[derive(Debug, Clone, Default)]
pub struct EguiField {
    state: Rc<RefCell<FieldState>>,
}

impl EguiField {
    pub fn new(state: Rc<RefCell<FieldState>>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Rc<RefCell<FieldState>> {
        &self.state
    }
}

impl ControlWidget for EguiField {
    fn create(&mut self, descriptor: &ControlDescriptor) {
        self.state.borrow_mut().descriptor = Some(descriptor.clone());
    }

    fn reload(&mut self, value: &PropertyValue) {
        let mut state = self.state.borrow_mut();
        state.shown = Some(value.clone());
        state.buffer = Some(value.clone());
        state.text = value.to_string();
        state.pending = None;
        state.error = None;
    }

    fn apply(&mut self) -> Option<PropertyValue> {
        self.state.borrow_mut().pending.take()
    }

    fn dispose(&mut self) {
        let mut state = self.state.borrow_mut();
        state.disposed = true;
        state.pending = None;
    }
}

/// Dragging commits once on release; typing commits when the edit ends.
fn committed(response: &egui::Response) -> bool {
    response.drag_stopped() || (response.changed() && !response.dragged())
}

fn int_drag(value: &mut i64, range: Option<NumericRange>) -> egui::DragValue<'_> {
    let drag = egui::DragValue::new(value).speed(range.map_or(1.0, |r| r.step.max(1.0)));
    match range {
        Some(r) => drag.range(r.min..=r.max),
        None => drag,
    }
}

fn float_drag(value: &mut f32, range: Option<NumericRange>) -> egui::DragValue<'_> {
    let drag = egui::DragValue::new(value).speed(range.map_or(0.1, |r| r.step));
    match range {
        Some(r) => drag.range(r.min..=r.max),
        None => drag,
    }
}

fn components(
    ui: &mut egui::Ui,
    values: [&mut f32; 3],
    count: usize,
    range: Option<NumericRange>,
) -> bool {
    let mut commit = false;
    ui.horizontal(|ui| {
        for (label, value) in ["x", "y", "z"].into_iter().zip(values).take(count) {
            let response = ui.add(float_drag(value, range).prefix(format!("{label}: ")));
            commit |= committed(&response);
        }
    });
    commit
}

/// Draw the editor for one field and return what the user did this frame.
pub(crate) fn draw_field(
    ui: &mut egui::Ui,
    state: &mut FieldState,
    has_chooser: bool,
) -> Option<FieldInput> {
    let Some(descriptor) = state.descriptor.clone() else {
        ui.weak("(no widget)");
        return None;
    };
    let shown_text = state
        .shown
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    let options = &descriptor.options;
    let range = options.range;
    let FieldState { buffer, text, .. } = state;

    ui.add_enabled_ui(!options.read_only, |ui| {
        let value = buffer.as_mut()?;
        match value {
            PropertyValue::Bool(v) => ui
                .checkbox(v, "")
                .changed()
                .then(|| FieldInput::Value(PropertyValue::Bool(*v))),
            PropertyValue::Int(v) => {
                let response = ui.add(int_drag(v, range));
                committed(&response).then(|| FieldInput::Value(PropertyValue::Int(*v)))
            }
            PropertyValue::Float(v) => {
                let response = ui.add(float_drag(v, range));
                committed(&response).then(|| FieldInput::Value(PropertyValue::Float(*v)))
            }
            PropertyValue::Vec2(v) => {
                let mut unused = 0.0;
                components(ui, [&mut v.x, &mut v.y, &mut unused], 2, range)
                    .then(|| FieldInput::Value(PropertyValue::Vec2(*v)))
            }
            PropertyValue::Vec3(v) => components(ui, [&mut v.x, &mut v.y, &mut v.z], 3, range)
                .then(|| FieldInput::Value(PropertyValue::Vec3(*v))),
            PropertyValue::Color(c) => {
                let mut rgba = c.to_array();
                if ui.color_edit_button_rgba_unmultiplied(&mut rgba).changed() {
                    *c = Color::from_array(rgba);
                    Some(FieldInput::Value(PropertyValue::Color(*c)))
                } else {
                    None
                }
            }
            PropertyValue::Enum(current) => {
                let mut chosen = None;
                egui::ComboBox::from_id_salt(&descriptor.name)
                    .selected_text(current.as_str())
                    .show_ui(ui, |ui| {
                        for variant in options.domain.iter().flatten() {
                            let selected = variant == current;
                            if ui.selectable_label(selected, variant.as_str()).clicked() {
                                chosen = Some(variant.clone());
                            }
                        }
                    });
                chosen
                    .filter(|variant| variant != current)
                    .map(|variant| FieldInput::Value(PropertyValue::Enum(variant)))
            }
            PropertyValue::Text(_) | PropertyValue::FloatArray(_) | PropertyValue::IntArray(_) => {
                let response = ui.text_edit_singleline(text);
                (response.lost_focus() && *text != shown_text)
                    .then(|| FieldInput::Text(text.clone()))
            }
            PropertyValue::Reference(target) => {
                let target = *target;
                ui.horizontal(|ui| {
                    ui.monospace(target.map_or_else(|| "none".to_string(), |id| id.short()));
                    if ui
                        .add_enabled(has_chooser, egui::Button::new("Choose…"))
                        .clicked()
                    {
                        return Some(FieldInput::Choose);
                    }
                    let can_clear = target.is_some() && !options.required;
                    if ui.add_enabled(can_clear, egui::Button::new("Clear")).clicked() {
                        return Some(FieldInput::Value(PropertyValue::Reference(None)));
                    }
                    None
                })
                .inner
            }
        }
    })
    .inner
}

#[cfg(test)]
mod tests {
    use super::*;
    use propkit_common::ValueKind;
    use propkit_property::PropertyOptions;

    fn descriptor(kind: ValueKind) -> ControlDescriptor {
        ControlDescriptor {
            name: "field".into(),
            kind,
            options: PropertyOptions::default(),
        }
    }

    #[test]
    fn reload_fills_every_buffer() {
        let mut field = EguiField::default();
        field.create(&descriptor(ValueKind::IntArray));
        field.state().borrow_mut().error = Some("stale".into());
        field.reload(&PropertyValue::IntArray(vec![1, 2]));

        let state = field.state().borrow();
        assert_eq!(state.shown, Some(PropertyValue::IntArray(vec![1, 2])));
        assert_eq!(state.buffer, state.shown);
        assert_eq!(state.text, "[1, 2]");
        assert!(state.error.is_none());
    }

    #[test]
    fn apply_drains_pending_input() {
        let mut field = EguiField::default();
        field.state().borrow_mut().pending = Some(PropertyValue::Bool(true));
        assert_eq!(field.apply(), Some(PropertyValue::Bool(true)));
        assert_eq!(field.apply(), None);
    }

    #[test]
    fn draw_without_input_reports_nothing() {
        let ctx = egui::Context::default();
        let values = [
            PropertyValue::Bool(true),
            PropertyValue::Int(3),
            PropertyValue::Float(1.5),
            PropertyValue::Vec2(glam::Vec2::new(1.0, 2.0)),
            PropertyValue::Text("hello".into()),
            PropertyValue::Enum("a".into()),
            PropertyValue::Color(Color::WHITE),
            PropertyValue::Reference(None),
        ];
        for value in values {
            let mut field = EguiField::default();
            field.create(&descriptor(value.kind()));
            field.reload(&value);
            let state = field.state().clone();
            let mut input = None;
            let _ = ctx.run(egui::RawInput::default(), |ctx| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    input = draw_field(ui, &mut state.borrow_mut(), false);
                });
            });
            assert_eq!(input, None, "{value:?}");
        }
    }
}

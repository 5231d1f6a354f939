use propkit_common::{PropertyValue, ValueKind};
use propkit_history::{ApplyError, ChangeConsumer, Operation};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

use crate::error::{ControlError, ValidationError};
use crate::property::{Property, PropertyOptions};
use crate::widget::{ControlWidget, HeadlessWidget, ReferenceChooser, Selection};

/// What a toolkit needs to know to build a widget for a control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlDescriptor {
    pub name: String,
    pub kind: ValueKind,
    pub options: PropertyOptions,
}

/// Binds one property of one object to one editable widget.
///
/// Lifecycle: **Clean** → user edit → **Dirty** → `apply()` → **Clean**,
/// or **Dirty** → `reload()` → **Clean** discarding the edit. Commits go
/// through the change consumer as an [`Operation`] so they can be undone.
pub struct PropertyControl<O> {
    property: Property<O>,
    object: O,
    consumer: Rc<dyn ChangeConsumer<O>>,
    last_synced: PropertyValue,
    transient: PropertyValue,
    dirty: bool,
    /// Set while the control itself updates the widget, so the toolkit's
    /// change events for that update are not treated as user input.
    ignore_listener: bool,
    widget: Box<dyn ControlWidget>,
    chooser: Option<Box<dyn ReferenceChooser>>,
}

impl<O: Clone + 'static> PropertyControl<O> {
    /// Bind `property` on `object`, reading its current value.
    ///
    /// Fails if the accessor yields a different kind than declared, if a
    /// required reference is empty, or if an enum value is outside its domain.
    pub fn bind(
        object: O,
        property: Property<O>,
        consumer: Rc<dyn ChangeConsumer<O>>,
    ) -> Result<Self, ControlError> {
        let value = checked_read(&property, &object)?;
        let mut control = Self {
            property,
            object,
            consumer,
            last_synced: value.clone(),
            transient: value,
            dirty: false,
            ignore_listener: false,
            widget: Box::new(HeadlessWidget::new()),
            chooser: None,
        };
        let descriptor = control.descriptor();
        control.widget.create(&descriptor);
        control.show_transient();
        tracing::debug!("bound `{}` = {}", control.name(), control.last_synced);
        Ok(control)
    }

    /// Point the control at another object. On error the old binding stays.
    pub fn rebind(&mut self, object: O) -> Result<(), ControlError> {
        let value = checked_read(&self.property, &object)?;
        self.object = object;
        self.last_synced = value.clone();
        self.transient = value;
        self.dirty = false;
        self.show_transient();
        Ok(())
    }

    /// Replace the widget, disposing the previous one.
    pub fn attach_widget(&mut self, widget: Box<dyn ControlWidget>) {
        self.widget.dispose();
        self.widget = widget;
        let descriptor = self.descriptor();
        self.widget.create(&descriptor);
        self.show_transient();
    }

    pub fn with_chooser(mut self, chooser: impl ReferenceChooser + 'static) -> Self {
        self.set_chooser(Box::new(chooser));
        self
    }

    /// Selection dialog used by [`choose_reference`](Self::choose_reference).
    pub fn set_chooser(&mut self, chooser: Box<dyn ReferenceChooser>) {
        self.chooser = Some(chooser);
    }

    /// Pull the authoritative value from the object, discarding local edits.
    ///
    /// If the accessor now yields a value the control cannot hold, the
    /// last synchronized value stays in place and the error is returned.
    pub fn reload(&mut self) -> Result<(), ControlError> {
        match checked_read(&self.property, &self.object) {
            Ok(value) => {
                self.last_synced = value.clone();
                self.transient = value;
                self.dirty = false;
                self.show_transient();
                Ok(())
            }
            Err(err) => {
                tracing::warn!("`{}` kept {}: {err}", self.name(), self.last_synced);
                self.revert();
                Err(err)
            }
        }
    }

    /// Feed user input into the control.
    ///
    /// Numeric input is clamped to the configured range before the dirty
    /// check. Rejected input reverts the widget to the last synchronized
    /// value and never reaches the change consumer.
    pub fn edit(&mut self, value: PropertyValue) -> Result<(), ValidationError> {
        if self.ignore_listener {
            return Ok(());
        }
        match self.validate(value.clone()) {
            Ok(accepted) => {
                let adjusted = accepted != value;
                self.transient = accepted;
                self.dirty = self.transient != self.last_synced;
                if adjusted {
                    self.show_transient();
                }
                Ok(())
            }
            Err(err) => {
                tracing::debug!("`{}` rejected input: {err}", self.name());
                self.revert();
                Err(err)
            }
        }
    }

    /// Feed text typed into the widget; parse failures count as invalid input.
    pub fn edit_text(&mut self, text: &str) -> Result<(), ValidationError> {
        if self.ignore_listener {
            return Ok(());
        }
        match PropertyValue::parse(self.kind(), text) {
            Ok(value) => self.edit(value),
            Err(err) => {
                tracing::debug!("`{}` could not parse {text:?}: {err}", self.name());
                self.revert();
                Err(err.into())
            }
        }
    }

    /// Commit the pending edit through the change consumer.
    ///
    /// Returns `Ok(false)` when there is nothing to commit. If the mutation
    /// is rejected the attempted value is discarded, the control reloads
    /// and the error is returned.
    pub fn apply(&mut self) -> Result<bool, ApplyError> {
        if self.ignore_listener {
            return Ok(false);
        }
        if let Some(pending) = self.widget.apply() {
            if self.edit(pending).is_err() {
                return Ok(false);
            }
        }
        if !self.dirty {
            return Ok(false);
        }

        let new_value = self.transient.clone();
        let operation = Operation::new(
            self.object.clone(),
            self.property.name(),
            new_value.clone(),
            self.last_synced.clone(),
            self.property.setter(),
        );
        match self.consumer.execute(operation) {
            Ok(()) => {
                tracing::debug!("`{}` committed {}", self.name(), new_value);
                self.last_synced = new_value;
                self.dirty = false;
                Ok(true)
            }
            Err(err) => {
                tracing::warn!("`{}` rejected {}: {err}", self.name(), new_value);
                // A failed reload already fell back to the last synced value.
                let _ = self.reload();
                Err(err)
            }
        }
    }

    /// Open the selection dialog of a reference control and commit its answer.
    ///
    /// Returns `Ok(false)` if the control has no chooser, is not a reference,
    /// or the dialog was cancelled.
    pub fn choose_reference(&mut self) -> Result<bool, ApplyError> {
        let PropertyValue::Reference(current) = self.transient else {
            return Ok(false);
        };
        let Some(chooser) = self.chooser.as_mut() else {
            tracing::debug!("`{}` has no reference chooser", self.name());
            return Ok(false);
        };
        match chooser.choose(current) {
            Selection::Cancelled => Ok(false),
            Selection::Chosen(id) => {
                if self.edit(PropertyValue::Reference(id)).is_err() {
                    return Ok(false);
                }
                self.apply()
            }
        }
    }

    fn validate(&self, value: PropertyValue) -> Result<PropertyValue, ValidationError> {
        let options = self.property.options();
        if options.read_only {
            return Err(ValidationError::ReadOnly(self.name().to_string()));
        }
        if value.kind() != self.kind() {
            return Err(ValidationError::WrongKind {
                expected: self.kind(),
                found: value.kind(),
            });
        }
        if value.has_non_finite() {
            return Err(ValidationError::NotFinite);
        }
        let value = match &options.range {
            Some(range) => range.clamp(value),
            None => value,
        };
        if let (PropertyValue::Enum(variant), Some(domain)) = (&value, &options.domain) {
            if !domain.contains(variant) {
                return Err(ValidationError::OutOfDomain {
                    property: self.name().to_string(),
                    value: variant.clone(),
                });
            }
        }
        if options.required && value.is_empty_reference() {
            return Err(ValidationError::Required(self.name().to_string()));
        }
        Ok(value)
    }
}

impl<O> PropertyControl<O> {
    pub fn name(&self) -> &str {
        self.property.name()
    }

    pub fn kind(&self) -> ValueKind {
        self.property.kind()
    }

    pub fn options(&self) -> &PropertyOptions {
        self.property.options()
    }

    pub fn descriptor(&self) -> ControlDescriptor {
        ControlDescriptor {
            name: self.name().to_string(),
            kind: self.kind(),
            options: self.options().clone(),
        }
    }

    /// The bound object.
    pub fn object(&self) -> &O {
        &self.object
    }

    pub fn consumer(&self) -> &Rc<dyn ChangeConsumer<O>> {
        &self.consumer
    }

    /// Value last read from or committed to the object.
    pub fn last_synced(&self) -> &PropertyValue {
        &self.last_synced
    }

    /// Value currently shown by the widget.
    pub fn transient(&self) -> &PropertyValue {
        &self.transient
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_read_only(&self) -> bool {
        self.options().read_only
    }

    pub fn has_chooser(&self) -> bool {
        self.chooser.is_some()
    }

    fn revert(&mut self) {
        self.transient = self.last_synced.clone();
        self.dirty = false;
        self.show_transient();
    }

    fn show_transient(&mut self) {
        self.ignore_listener = true;
        self.widget.reload(&self.transient);
        self.ignore_listener = false;
    }
}

impl<O> Drop for PropertyControl<O> {
    fn drop(&mut self) {
        self.widget.dispose();
    }
}

impl<O: fmt::Debug> fmt::Debug for PropertyControl<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyControl")
            .field("property", &self.property)
            .field("object", &self.object)
            .field("last_synced", &self.last_synced)
            .field("transient", &self.transient)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

fn checked_read<O>(property: &Property<O>, object: &O) -> Result<PropertyValue, ControlError> {
    let options = property.options();
    if property.kind() == ValueKind::Enum && options.domain.as_ref().is_none_or(Vec::is_empty) {
        return Err(ControlError::MissingDomain(property.name().to_string()));
    }
    let value = property.get(object);
    if value.kind() != property.kind() {
        return Err(ControlError::KindMismatch {
            property: property.name().to_string(),
            declared: property.kind(),
            found: value.kind(),
        });
    }
    if options.required && value.is_empty_reference() {
        return Err(ControlError::InvalidProperty(property.name().to_string()));
    }
    if let (PropertyValue::Enum(variant), Some(domain)) = (&value, &options.domain) {
        if !domain.contains(variant) {
            return Err(ControlError::EnumDomainViolation {
                property: property.name().to_string(),
                value: variant.clone(),
            });
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use propkit_common::{Color, ObjectId};
    use propkit_history::EditHistory;
    use std::cell::RefCell;

    #[derive(Debug)]
    struct Sample {
        count: i64,
        ratio: f32,
        offset: Vec3,
        mode: String,
        target: Option<ObjectId>,
    }

    type Target = Rc<RefCell<Sample>>;

    fn sample() -> Target {
        Rc::new(RefCell::new(Sample {
            count: 5,
            ratio: 0.5,
            offset: Vec3::ZERO,
            mode: "fast".into(),
            target: None,
        }))
    }

    fn session() -> (Rc<EditHistory<Target>>, Rc<dyn ChangeConsumer<Target>>) {
        let history = Rc::new(EditHistory::new());
        let consumer: Rc<dyn ChangeConsumer<Target>> = history.clone();
        (history, consumer)
    }

    fn count() -> Property<Target> {
        Property::typed(
            "count",
            |s: &Target| s.borrow().count,
            |s: &Target, v: i64| {
                s.borrow_mut().count = v;
                Ok(())
            },
        )
    }

    fn ratio() -> Property<Target> {
        Property::typed(
            "ratio",
            |s: &Target| s.borrow().ratio,
            |s: &Target, v: f32| {
                if v < 0.0 {
                    return Err(ApplyError::rejected("ratio", "must be non-negative"));
                }
                s.borrow_mut().ratio = v;
                Ok(())
            },
        )
    }

    fn offset() -> Property<Target> {
        Property::typed(
            "offset",
            |s: &Target| s.borrow().offset,
            |s: &Target, v: Vec3| {
                s.borrow_mut().offset = v;
                Ok(())
            },
        )
        .with_range(-10.0, 10.0)
    }

    fn mode() -> Property<Target> {
        Property::dynamic(
            "mode",
            ValueKind::Enum,
            |s: &Target| PropertyValue::Enum(s.borrow().mode.clone()),
            |s: &Target, v: &PropertyValue| match v {
                PropertyValue::Enum(name) => {
                    s.borrow_mut().mode = name.clone();
                    Ok(())
                }
                other => Err(ApplyError::KindMismatch {
                    property: "mode".into(),
                    expected: ValueKind::Enum,
                    found: other.kind(),
                }),
            },
        )
        .with_domain(["fast", "slow"])
    }

    fn target() -> Property<Target> {
        Property::typed(
            "target",
            |s: &Target| s.borrow().target,
            |s: &Target, v: Option<ObjectId>| {
                s.borrow_mut().target = v;
                Ok(())
            },
        )
    }

    #[derive(Default)]
    struct SpyLog {
        created: Option<String>,
        shown: Vec<PropertyValue>,
        pending: Option<PropertyValue>,
        disposed: bool,
    }

    struct SpyWidget(Rc<RefCell<SpyLog>>);

    impl ControlWidget for SpyWidget {
        fn create(&mut self, descriptor: &ControlDescriptor) {
            self.0.borrow_mut().created = Some(descriptor.name.clone());
        }

        fn reload(&mut self, value: &PropertyValue) {
            self.0.borrow_mut().shown.push(value.clone());
        }

        fn apply(&mut self) -> Option<PropertyValue> {
            self.0.borrow_mut().pending.take()
        }

        fn dispose(&mut self) {
            self.0.borrow_mut().disposed = true;
        }
    }

    fn spy(control: &mut PropertyControl<Target>) -> Rc<RefCell<SpyLog>> {
        let log = Rc::new(RefCell::new(SpyLog::default()));
        control.attach_widget(Box::new(SpyWidget(log.clone())));
        log
    }

    #[test]
    fn numeric_edit_apply_undo() {
        let object = sample();
        let (history, consumer) = session();
        let mut control = PropertyControl::bind(object.clone(), count(), consumer).unwrap();

        control.edit(PropertyValue::Int(7)).unwrap();
        assert!(control.is_dirty());
        assert!(control.apply().unwrap());
        assert!(!control.is_dirty());
        assert_eq!(history.undo_description().as_deref(), Some("count: 5 -> 7"));
        assert_eq!(object.borrow().count, 7);

        assert!(history.undo().unwrap());
        assert_eq!(object.borrow().count, 5);
        control.reload().unwrap();
        assert_eq!(control.transient(), &PropertyValue::Int(5));
    }

    #[test]
    fn rejected_apply_reloads_prior_value() {
        let object = sample();
        let (history, consumer) = session();
        let mut control = PropertyControl::bind(object.clone(), ratio(), consumer).unwrap();
        let log = spy(&mut control);

        control.edit(PropertyValue::Float(-1.0)).unwrap();
        assert!(control.is_dirty());
        let err = control.apply().unwrap_err();
        assert!(matches!(err, ApplyError::Rejected { .. }));
        assert_eq!(history.undo_count(), 0);
        assert!(!control.is_dirty());
        assert_eq!(log.borrow().shown.last(), Some(&PropertyValue::Float(0.5)));

        control.reload().unwrap();
        assert_eq!(control.transient(), &PropertyValue::Float(0.5));
        assert_eq!(object.borrow().ratio, 0.5);
    }

    #[test]
    fn reload_is_idempotent() {
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(sample(), offset(), consumer).unwrap();
        control.reload().unwrap();
        let first = control.transient().clone();
        control.reload().unwrap();
        assert_eq!(control.transient(), &first);
        assert!(!control.is_dirty());
    }

    #[test]
    fn dirty_tracks_transient_against_synced() {
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(sample(), count(), consumer).unwrap();
        let check = |c: &PropertyControl<Target>| {
            assert_eq!(c.is_dirty(), c.transient() != c.last_synced());
        };
        check(&control);
        control.edit(PropertyValue::Int(9)).unwrap();
        check(&control);
        control.edit(PropertyValue::Int(5)).unwrap();
        check(&control);
        assert!(!control.is_dirty());
        control.edit(PropertyValue::Int(6)).unwrap();
        control.apply().unwrap();
        check(&control);
        control.edit(PropertyValue::Int(1)).unwrap();
        control.reload().unwrap();
        check(&control);
    }

    #[test]
    fn clean_apply_is_noop() {
        let (history, consumer) = session();
        let mut control = PropertyControl::bind(sample(), count(), consumer).unwrap();
        assert!(!control.apply().unwrap());
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn numeric_input_is_clamped_before_dirty_check() {
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(sample(), offset(), consumer).unwrap();
        let log = spy(&mut control);

        control
            .edit(PropertyValue::Vec3(Vec3::new(20.0, 0.0, -30.0)))
            .unwrap();
        let clamped = PropertyValue::Vec3(Vec3::new(10.0, 0.0, -10.0));
        assert_eq!(control.transient(), &clamped);
        assert_eq!(log.borrow().shown.last(), Some(&clamped));
        assert!(control.is_dirty());
    }

    #[test]
    fn malformed_text_reverts_widget() {
        let object = sample();
        let (history, consumer) = session();
        let mut control = PropertyControl::bind(object, count(), consumer).unwrap();
        let log = spy(&mut control);

        control.edit(PropertyValue::Int(8)).unwrap();
        let err = control.edit_text("eight").unwrap_err();
        assert!(matches!(err, ValidationError::Parse(_)));
        assert_eq!(control.transient(), &PropertyValue::Int(5));
        assert_eq!(log.borrow().shown.last(), Some(&PropertyValue::Int(5)));
        assert!(!control.apply().unwrap());
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn text_entry_commits() {
        let object = sample();
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(object.clone(), offset(), consumer).unwrap();
        control.edit_text("1, 2, 3").unwrap();
        assert!(control.apply().unwrap());
        assert_eq!(object.borrow().offset, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn enum_outside_domain_is_rejected() {
        let object = sample();
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(object.clone(), mode(), consumer).unwrap();

        let err = control
            .edit(PropertyValue::Enum("medium".into()))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfDomain { .. }));
        assert!(!control.is_dirty());

        control.edit(PropertyValue::Enum("slow".into())).unwrap();
        control.apply().unwrap();
        assert_eq!(object.borrow().mode, "slow");
    }

    #[test]
    fn wrong_kind_and_non_finite_input_rejected() {
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(sample(), ratio(), consumer).unwrap();
        assert!(matches!(
            control.edit(PropertyValue::Int(1)),
            Err(ValidationError::WrongKind { .. })
        ));
        assert_eq!(
            control.edit(PropertyValue::Float(f32::NAN)),
            Err(ValidationError::NotFinite)
        );
    }

    #[test]
    fn read_only_rejects_edits() {
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(sample(), count().read_only(), consumer).unwrap();
        assert!(control.is_read_only());
        assert_eq!(
            control.edit(PropertyValue::Int(1)),
            Err(ValidationError::ReadOnly("count".into()))
        );
    }

    #[test]
    fn bind_detects_kind_mismatch() {
        let (_history, consumer) = session();
        let wrong = Property::dynamic(
            "count",
            ValueKind::Float,
            |s: &Target| PropertyValue::Int(s.borrow().count),
            |_: &Target, _: &PropertyValue| Ok(()),
        );
        let err = PropertyControl::bind(sample(), wrong, consumer).unwrap_err();
        assert_eq!(
            err,
            ControlError::KindMismatch {
                property: "count".into(),
                declared: ValueKind::Float,
                found: ValueKind::Int,
            }
        );
    }

    #[test]
    fn bind_detects_missing_required_reference() {
        let (_history, consumer) = session();
        let err = PropertyControl::bind(sample(), target().required(), consumer.clone()).unwrap_err();
        assert_eq!(err, ControlError::InvalidProperty("target".into()));

        // Optional references treat "no value" as a valid state.
        let control = PropertyControl::bind(sample(), target(), consumer).unwrap();
        assert_eq!(control.transient(), &PropertyValue::Reference(None));
    }

    #[test]
    fn bind_detects_enum_outside_domain() {
        let object = sample();
        object.borrow_mut().mode = "warp".into();
        let (_history, consumer) = session();
        let err = PropertyControl::bind(object, mode(), consumer).unwrap_err();
        assert!(matches!(err, ControlError::EnumDomainViolation { .. }));
    }

    #[test]
    fn enum_without_domain_cannot_bind() {
        let (_history, consumer) = session();
        let loose = Property::dynamic(
            "mode",
            ValueKind::Enum,
            |s: &Target| PropertyValue::Enum(s.borrow().mode.clone()),
            |_: &Target, _: &PropertyValue| Ok(()),
        );
        let err = PropertyControl::bind(sample(), loose.clone(), consumer.clone()).unwrap_err();
        assert_eq!(err, ControlError::MissingDomain("mode".into()));

        let empty = loose.with_domain(Vec::<String>::new());
        assert!(matches!(
            PropertyControl::bind(sample(), empty, consumer),
            Err(ControlError::MissingDomain(_))
        ));
    }

    #[test]
    fn reload_keeps_synced_value_when_accessor_changes_kind() {
        let object = sample();
        let (_history, consumer) = session();
        let shifting = Property::dynamic(
            "count",
            ValueKind::Int,
            |s: &Target| {
                let s = s.borrow();
                if s.mode == "broken" {
                    PropertyValue::Float(s.ratio)
                } else {
                    PropertyValue::Int(s.count)
                }
            },
            |_: &Target, _: &PropertyValue| Ok(()),
        );
        let mut control = PropertyControl::bind(object.clone(), shifting, consumer).unwrap();
        let log = spy(&mut control);
        control.edit(PropertyValue::Int(8)).unwrap();

        object.borrow_mut().mode = "broken".into();
        let err = control.reload().unwrap_err();
        assert!(matches!(err, ControlError::KindMismatch { found: ValueKind::Float, .. }));
        assert_eq!(control.last_synced(), &PropertyValue::Int(5));
        assert_eq!(control.transient(), &PropertyValue::Int(5));
        assert!(!control.is_dirty());
        assert_eq!(log.borrow().shown.last(), Some(&PropertyValue::Int(5)));
    }

    #[test]
    fn undo_restores_structurally_equal_values() {
        type Slot = Rc<RefCell<PropertyValue>>;
        let id = ObjectId::new();
        let cases = [
            (
                PropertyValue::Vec3(Vec3::new(1.0, -2.0, 0.5)),
                PropertyValue::Vec3(Vec3::new(4.0, 0.0, -1.5)),
            ),
            (
                PropertyValue::Color(Color::rgb(0.1, 0.2, 0.3)),
                PropertyValue::Color(Color::rgb(0.9, 0.8, 0.7)),
            ),
            (
                PropertyValue::FloatArray(vec![0.25, 1.0]),
                PropertyValue::FloatArray(vec![3.0, 2.0, 1.0]),
            ),
            (PropertyValue::Reference(None), PropertyValue::Reference(Some(id))),
            (PropertyValue::Reference(Some(id)), PropertyValue::Reference(None)),
        ];
        for (before, after) in cases {
            let slot: Slot = Rc::new(RefCell::new(before.clone()));
            let history = Rc::new(EditHistory::new());
            let consumer: Rc<dyn ChangeConsumer<Slot>> = history.clone();
            let property = Property::dynamic(
                "value",
                before.kind(),
                |s: &Slot| s.borrow().clone(),
                |s: &Slot, v: &PropertyValue| {
                    *s.borrow_mut() = v.clone();
                    Ok(())
                },
            );
            let mut control = PropertyControl::bind(slot.clone(), property, consumer).unwrap();

            control.edit(after.clone()).unwrap();
            assert!(control.apply().unwrap());
            assert_eq!(*slot.borrow(), after);

            assert!(history.undo().unwrap());
            assert_eq!(*slot.borrow(), before);
            control.reload().unwrap();
            assert_eq!(control.transient(), &before);

            assert!(history.redo().unwrap());
            assert_eq!(*slot.borrow(), after);
        }
    }

    #[test]
    fn rebind_replaces_binding() {
        let first = sample();
        let second = sample();
        second.borrow_mut().count = 40;
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(first.clone(), count(), consumer).unwrap();
        control.edit(PropertyValue::Int(6)).unwrap();

        control.rebind(second.clone()).unwrap();
        assert!(Rc::ptr_eq(control.object(), &second));
        assert_eq!(control.last_synced(), &PropertyValue::Int(40));
        assert!(!control.is_dirty());

        control.edit(PropertyValue::Int(41)).unwrap();
        control.apply().unwrap();
        assert_eq!(second.borrow().count, 41);
        assert_eq!(first.borrow().count, 5);
    }

    #[test]
    fn widget_pending_input_is_applied() {
        let object = sample();
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(object.clone(), count(), consumer).unwrap();
        let log = spy(&mut control);
        assert_eq!(log.borrow().created.as_deref(), Some("count"));

        log.borrow_mut().pending = Some(PropertyValue::Int(12));
        assert!(control.apply().unwrap());
        assert_eq!(object.borrow().count, 12);
    }

    #[test]
    fn chooser_sets_reference() {
        let object = sample();
        let picked = ObjectId::new();
        let (history, consumer) = session();
        let mut control = PropertyControl::bind(object.clone(), target(), consumer)
            .unwrap()
            .with_chooser(move |current: Option<ObjectId>| {
                assert_eq!(current, None);
                Selection::Chosen(Some(picked))
            });

        assert!(control.choose_reference().unwrap());
        assert_eq!(object.borrow().target, Some(picked));
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn cancelled_chooser_changes_nothing() {
        let (history, consumer) = session();
        let mut control = PropertyControl::bind(sample(), target(), consumer)
            .unwrap()
            .with_chooser(|_: Option<ObjectId>| Selection::Cancelled);
        assert!(!control.choose_reference().unwrap());
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn dropping_disposes_widget() {
        let (_history, consumer) = session();
        let mut control = PropertyControl::bind(sample(), count(), consumer).unwrap();
        let log = spy(&mut control);
        assert!(!log.borrow().disposed);
        drop(control);
        assert!(log.borrow().disposed);
    }
}

use propkit_history::ChangeConsumer;
use propkit_property::ControlError;
use std::rc::Rc;

use crate::panel::{Container, PropertyPanel};

/// Contributes the controls for one aspect of an object.
pub trait Builder<O> {
    /// Title of the group this builder contributes.
    fn name(&self) -> &str;

    /// Pure capability test; must not depend on mutable global state.
    fn matches(&self, object: &O) -> bool;

    /// Append this builder's controls to `container` in a fixed order.
    ///
    /// `parent` is the object's owner when known. Controls that need it are
    /// skipped when it is `None`.
    fn build(
        &self,
        object: &O,
        parent: Option<&O>,
        container: &mut dyn Container<O>,
        consumer: &Rc<dyn ChangeConsumer<O>>,
    ) -> Result<(), ControlError>;
}

type Predicate<O> = Box<dyn Fn(&O) -> bool>;
type BuildFn<O> = Box<
    dyn Fn(&O, Option<&O>, &mut dyn Container<O>, &Rc<dyn ChangeConsumer<O>>) -> Result<(), ControlError>,
>;

/// A builder made of a predicate and a build closure.
pub struct FnBuilder<O> {
    name: String,
    predicate: Predicate<O>,
    build: BuildFn<O>,
}

impl<O> FnBuilder<O> {
    pub fn new<P, B>(name: impl Into<String>, predicate: P, build: B) -> Self
    where
        P: Fn(&O) -> bool + 'static,
        B: Fn(&O, Option<&O>, &mut dyn Container<O>, &Rc<dyn ChangeConsumer<O>>) -> Result<(), ControlError>
            + 'static,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            build: Box::new(build),
        }
    }
}

impl<O> Builder<O> for FnBuilder<O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, object: &O) -> bool {
        (self.predicate)(object)
    }

    fn build(
        &self,
        object: &O,
        parent: Option<&O>,
        container: &mut dyn Container<O>,
        consumer: &Rc<dyn ChangeConsumer<O>>,
    ) -> Result<(), ControlError> {
        (self.build)(object, parent, container, consumer)
    }
}

/// Ordered collection of builders, assembled once at startup.
///
/// Builders are only ever appended; order decides grouping and display
/// order, never which builders run.
pub struct BuilderRegistry<O> {
    builders: Vec<Box<dyn Builder<O>>>,
}

impl<O> BuilderRegistry<O> {
    pub fn new() -> Self {
        Self {
            builders: Vec::new(),
        }
    }

    /// Append a builder after all previously registered ones.
    pub fn register(&mut self, builder: impl Builder<O> + 'static) -> &mut Self {
        self.builders.push(Box::new(builder));
        self
    }

    pub fn with(mut self, builder: impl Builder<O> + 'static) -> Self {
        self.register(builder);
        self
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Builder names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.builders.iter().map(|b| b.name()).collect()
    }

    /// Names of the builders that apply to `object`, in dispatch order.
    pub fn matching(&self, object: &O) -> Vec<&str> {
        self.builders
            .iter()
            .filter(|b| b.matches(object))
            .map(|b| b.name())
            .collect()
    }

    /// Run every matching builder, in registration order, against `container`.
    ///
    /// Returns how many builders ran. A construction error stops dispatch
    /// and is returned; the host should discard the partially built panel.
    pub fn dispatch(
        &self,
        object: &O,
        parent: Option<&O>,
        container: &mut dyn Container<O>,
        consumer: &Rc<dyn ChangeConsumer<O>>,
    ) -> Result<usize, ControlError> {
        let _span = tracing::info_span!("dispatch", registered = self.builders.len()).entered();
        let mut matched = 0;
        for builder in &self.builders {
            if !builder.matches(object) {
                continue;
            }
            container.begin_group(builder.name());
            builder.build(object, parent, container, consumer)?;
            matched += 1;
        }
        tracing::debug!(matched, has_parent = parent.is_some(), "dispatched");
        Ok(matched)
    }

    /// Dispatch into a fresh [`PropertyPanel`].
    pub fn build_panel(
        &self,
        object: &O,
        parent: Option<&O>,
        consumer: &Rc<dyn ChangeConsumer<O>>,
    ) -> Result<PropertyPanel<O>, ControlError> {
        let mut panel = PropertyPanel::new();
        self.dispatch(object, parent, &mut panel, consumer)?;
        Ok(panel)
    }
}

impl<O> Default for BuilderRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use propkit_common::PropertyValue;
    use propkit_history::EditHistory;
    use propkit_property::{Property, PropertyControl};
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct Thing {
        label: String,
        position: Option<Vec3>,
        brightness: Option<f32>,
        owner_tag: i64,
    }

    #[derive(Debug, Clone)]
    struct Handle(Rc<RefCell<Thing>>);

    impl PartialEq for Handle {
        fn eq(&self, other: &Self) -> bool {
            Rc::ptr_eq(&self.0, &other.0)
        }
    }

    fn handle(thing: Thing) -> Handle {
        Handle(Rc::new(RefCell::new(thing)))
    }

    fn label_builder() -> FnBuilder<Handle> {
        FnBuilder::new(
            "Thing",
            |_: &Handle| true,
            |object: &Handle,
             _: Option<&Handle>,
             container: &mut dyn Container<Handle>,
             consumer: &Rc<dyn ChangeConsumer<Handle>>| {
                let label = Property::typed(
                    "label",
                    |h: &Handle| h.0.borrow().label.clone(),
                    |h: &Handle, v: String| {
                        h.0.borrow_mut().label = v;
                        Ok(())
                    },
                );
                container.append(PropertyControl::bind(object.clone(), label, consumer.clone())?);
                Ok(())
            },
        )
    }

    fn position_builder() -> FnBuilder<Handle> {
        FnBuilder::new(
            "Position",
            |h: &Handle| h.0.borrow().position.is_some(),
            |object: &Handle,
             parent: Option<&Handle>,
             container: &mut dyn Container<Handle>,
             consumer: &Rc<dyn ChangeConsumer<Handle>>| {
                let position = Property::typed(
                    "position",
                    |h: &Handle| h.0.borrow().position.unwrap_or_default(),
                    |h: &Handle, v: Vec3| {
                        h.0.borrow_mut().position = Some(v);
                        Ok(())
                    },
                );
                container.append(PropertyControl::bind(object.clone(), position, consumer.clone())?);
                // Only meaningful relative to an owner.
                if parent.is_some() {
                    let tag = Property::typed(
                        "owner_tag",
                        |h: &Handle| h.0.borrow().owner_tag,
                        |h: &Handle, v: i64| {
                            h.0.borrow_mut().owner_tag = v;
                            Ok(())
                        },
                    );
                    container.append(PropertyControl::bind(object.clone(), tag, consumer.clone())?);
                }
                Ok(())
            },
        )
    }

    fn brightness_builder() -> FnBuilder<Handle> {
        FnBuilder::new(
            "Light",
            |h: &Handle| h.0.borrow().brightness.is_some(),
            |object: &Handle,
             _: Option<&Handle>,
             container: &mut dyn Container<Handle>,
             consumer: &Rc<dyn ChangeConsumer<Handle>>| {
                let brightness = Property::typed(
                    "brightness",
                    |h: &Handle| h.0.borrow().brightness.unwrap_or_default(),
                    |h: &Handle, v: f32| {
                        h.0.borrow_mut().brightness = Some(v);
                        Ok(())
                    },
                )
                .with_range(0.0, 10.0);
                container.append(PropertyControl::bind(object.clone(), brightness, consumer.clone())?);
                Ok(())
            },
        )
    }

    fn registry() -> BuilderRegistry<Handle> {
        BuilderRegistry::new()
            .with(label_builder())
            .with(position_builder())
            .with(brightness_builder())
    }

    fn consumer() -> Rc<dyn ChangeConsumer<Handle>> {
        Rc::new(EditHistory::new())
    }

    #[test]
    fn all_matching_builders_run_in_order() {
        let lamp = handle(Thing {
            position: Some(Vec3::ONE),
            brightness: Some(2.0),
            ..Thing::default()
        });
        let panel = registry().build_panel(&lamp, None, &consumer()).unwrap();

        assert_eq!(panel.names(), ["label", "position", "brightness"]);
        let titles: Vec<&str> = panel.groups().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, ["Thing", "Position", "Light"]);
    }

    #[test]
    fn non_matching_builders_are_skipped() {
        let bare = handle(Thing::default());
        let registry = registry();
        assert_eq!(registry.matching(&bare), ["Thing"]);
        let panel = registry.build_panel(&bare, None, &consumer()).unwrap();
        assert_eq!(panel.names(), ["label"]);
    }

    #[test]
    fn dispatch_is_deterministic() {
        let lamp = handle(Thing {
            position: Some(Vec3::ZERO),
            brightness: Some(1.0),
            ..Thing::default()
        });
        let registry = registry();
        let consumer = consumer();
        let describe = |panel: &PropertyPanel<Handle>| {
            panel
                .controls()
                .iter()
                .map(|c| (c.name().to_string(), c.kind()))
                .collect::<Vec<_>>()
        };
        let first = registry.build_panel(&lamp, None, &consumer).unwrap();
        let second = registry.build_panel(&lamp, None, &consumer).unwrap();
        assert_eq!(describe(&first), describe(&second));
    }

    #[test]
    fn parent_context_enables_dependent_controls() {
        let owner = handle(Thing::default());
        let child = handle(Thing {
            position: Some(Vec3::X),
            ..Thing::default()
        });
        let registry = registry();
        let consumer = consumer();

        let orphan = registry.build_panel(&child, None, &consumer).unwrap();
        assert!(orphan.control("owner_tag").is_none());

        let owned = registry.build_panel(&child, Some(&owner), &consumer).unwrap();
        assert_eq!(owned.names(), ["label", "position", "owner_tag"]);
    }

    #[test]
    fn construction_errors_stop_dispatch() {
        let broken = FnBuilder::new(
            "Broken",
            |_: &Handle| true,
            |object: &Handle,
             _: Option<&Handle>,
             container: &mut dyn Container<Handle>,
             consumer: &Rc<dyn ChangeConsumer<Handle>>| {
                let wrong = Property::dynamic(
                    "label",
                    propkit_common::ValueKind::Int,
                    |h: &Handle| PropertyValue::Text(h.0.borrow().label.clone()),
                    |_: &Handle, _: &PropertyValue| Ok(()),
                );
                container.append(PropertyControl::bind(object.clone(), wrong, consumer.clone())?);
                Ok(())
            },
        );
        let registry = BuilderRegistry::new().with(broken).with(label_builder());
        let result = registry.build_panel(&handle(Thing::default()), None, &consumer());
        assert!(matches!(result, Err(ControlError::KindMismatch { .. })));
    }

    #[test]
    fn registry_reports_names() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), ["Thing", "Position", "Light"]);
        assert!(BuilderRegistry::<Handle>::default().is_empty());
    }
}

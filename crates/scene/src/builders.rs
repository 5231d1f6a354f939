use glam::{Vec2, Vec3};
use propkit_builder::{Builder, BuilderRegistry, Container};
use propkit_common::{Color, EditableValue, ObjectId};
use propkit_history::{ApplyError, ChangeConsumer};
use propkit_property::{
    ControlError, NumericRange, Property, PropertyControl, ReferenceCandidate, ReferenceChooser,
};
use std::rc::Rc;

use crate::handle::NodeHandle;
use crate::node::{Emitter, Light, LightKind, Node, Shape, Transform};
use crate::scene::Scene;

/// Builds the selection dialog for a reference control from its candidates.
pub type ChooserFactory = Rc<dyn Fn(&[ReferenceCandidate]) -> Box<dyn ReferenceChooser>>;

type Consumer = Rc<dyn ChangeConsumer<NodeHandle>>;

/// Property whose accessors run against the node behind the handle.
///
/// Reading a removed node yields the default value; writing one fails with
/// [`ApplyError::TargetMissing`].
fn node_property<T, G, S>(name: &'static str, get: G, set: S) -> Property<NodeHandle>
where
    T: EditableValue + Default,
    G: Fn(&Node) -> T + 'static,
    S: Fn(&mut Node, T) -> Result<(), ApplyError> + 'static,
{
    Property::typed(
        name,
        move |handle: &NodeHandle| handle.read(&get).unwrap_or_default(),
        move |handle: &NodeHandle, value: T| handle.update(|node| set(node, value)),
    )
}

/// Accessors for one optional aspect of a node.
struct Aspect<A> {
    label: &'static str,
    get: fn(&Node) -> Option<&A>,
    get_mut: fn(&mut Node) -> Option<&mut A>,
}

impl<A> Clone for Aspect<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Aspect<A> {}

const TRANSFORM: Aspect<Transform> = Aspect {
    label: "transform",
    get: |node| node.transform.as_ref(),
    get_mut: |node| node.transform.as_mut(),
};

const LIGHT: Aspect<Light> = Aspect {
    label: "light",
    get: |node| node.light.as_ref(),
    get_mut: |node| node.light.as_mut(),
};

const SHAPE: Aspect<Shape> = Aspect {
    label: "shape",
    get: |node| node.shape.as_ref(),
    get_mut: |node| node.shape.as_mut(),
};

const EMITTER: Aspect<Emitter> = Aspect {
    label: "emitter",
    get: |node| node.emitter.as_ref(),
    get_mut: |node| node.emitter.as_mut(),
};

impl<A: 'static> Aspect<A> {
    fn present(self, handle: &NodeHandle) -> bool {
        handle.read(|node| (self.get)(node).is_some()).unwrap_or(false)
    }

    fn property<T, G, S>(self, name: &'static str, get: G, set: S) -> Property<NodeHandle>
    where
        T: EditableValue + Default,
        G: Fn(&A) -> T + 'static,
        S: Fn(&mut A, T) -> Result<(), ApplyError> + 'static,
    {
        node_property(
            name,
            move |node: &Node| (self.get)(node).map(&get).unwrap_or_default(),
            move |node: &mut Node, value: T| {
                let aspect = (self.get_mut)(node).ok_or_else(|| {
                    ApplyError::rejected(name, format!("node has no {}", self.label))
                })?;
                set(aspect, value)
            },
        )
    }
}

fn append(
    container: &mut dyn Container<NodeHandle>,
    object: &NodeHandle,
    property: Property<NodeHandle>,
    consumer: &Consumer,
) -> Result<(), ControlError> {
    container.append(PropertyControl::bind(object.clone(), property, consumer.clone())?);
    Ok(())
}

fn non_negative(property: &str, value: f32) -> Result<(), ApplyError> {
    if value < 0.0 {
        return Err(ApplyError::rejected(property, "must be non-negative"));
    }
    Ok(())
}

/// Name, visibility and layers. Applies to every node.
#[derive(Debug, Default)]
pub struct NodeBuilder;

impl Builder<NodeHandle> for NodeBuilder {
    fn name(&self) -> &str {
        "Node"
    }

    fn matches(&self, _object: &NodeHandle) -> bool {
        true
    }

    fn build(
        &self,
        object: &NodeHandle,
        _parent: Option<&NodeHandle>,
        container: &mut dyn Container<NodeHandle>,
        consumer: &Consumer,
    ) -> Result<(), ControlError> {
        let id = object.id();
        let properties = [
            Property::typed(
                "id",
                move |_: &NodeHandle| id.to_string(),
                |_: &NodeHandle, _: String| Err(ApplyError::rejected("id", "ids are fixed")),
            )
            .read_only(),
            node_property(
                "name",
                |node: &Node| node.name.clone(),
                |node: &mut Node, name: String| {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(ApplyError::rejected("name", "must not be blank"));
                    }
                    node.name = name.to_string();
                    Ok(())
                },
            ),
            node_property(
                "visible",
                |node: &Node| node.visible,
                |node: &mut Node, visible: bool| {
                    node.visible = visible;
                    Ok(())
                },
            ),
            node_property(
                "layers",
                |node: &Node| node.layers.clone(),
                |node: &mut Node, mut layers: Vec<i64>| {
                    layers.sort_unstable();
                    layers.dedup();
                    node.layers = layers;
                    Ok(())
                },
            )
            .with_numeric_range(NumericRange::new(0.0, 31.0).with_step(1.0)),
        ];
        for property in properties {
            append(container, object, property, consumer)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TransformBuilder;

impl Builder<NodeHandle> for TransformBuilder {
    fn name(&self) -> &str {
        "Transform"
    }

    fn matches(&self, object: &NodeHandle) -> bool {
        TRANSFORM.present(object)
    }

    fn build(
        &self,
        object: &NodeHandle,
        _parent: Option<&NodeHandle>,
        container: &mut dyn Container<NodeHandle>,
        consumer: &Consumer,
    ) -> Result<(), ControlError> {
        let properties = [
            TRANSFORM.property(
                "translation",
                |t: &Transform| t.translation,
                |t: &mut Transform, v: Vec3| {
                    t.translation = v;
                    Ok(())
                },
            ),
            TRANSFORM
                .property(
                    "rotation",
                    |t: &Transform| t.rotation,
                    |t: &mut Transform, v: Vec3| {
                        t.rotation = v;
                        Ok(())
                    },
                )
                .with_numeric_range(NumericRange::new(-360.0, 360.0).with_step(1.0)),
            TRANSFORM
                .property(
                    "scale",
                    |t: &Transform| t.scale,
                    |t: &mut Transform, v: Vec3| {
                        t.scale = v;
                        Ok(())
                    },
                )
                .with_numeric_range(NumericRange::new(0.001, 1000.0).with_step(0.01)),
        ];
        for property in properties {
            append(container, object, property, consumer)?;
        }
        Ok(())
    }
}

/// Light parameters. The target control needs the parent: candidates are
/// the light's siblings that have a transform.
#[derive(Default)]
pub struct LightBuilder {
    chooser: Option<ChooserFactory>,
}

impl LightBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give target controls a selection dialog built by `factory`.
    pub fn with_chooser(mut self, factory: ChooserFactory) -> Self {
        self.chooser = Some(factory);
        self
    }

    fn candidates(
        object: &NodeHandle,
        parent: &NodeHandle,
        consumer: &Consumer,
    ) -> Vec<ReferenceCandidate> {
        // Resolve through the session's root so a detached handle still
        // lists the nodes of the scene being edited.
        let scene = consumer
            .current_model()
            .map(|root| root.scene().clone())
            .unwrap_or_else(|| object.scene().clone());
        let scene = scene.borrow();
        scene
            .children(parent.id())
            .iter()
            .filter(|id| **id != object.id())
            .filter_map(|id| {
                let node = scene.get(*id)?;
                node.transform.is_some().then(|| ReferenceCandidate {
                    id: *id,
                    label: node.name.clone(),
                })
            })
            .collect()
    }

    fn target_property(object: &NodeHandle) -> Property<NodeHandle> {
        let own = object.id();
        Property::typed(
            "target",
            |handle: &NodeHandle| {
                handle
                    .read(|node| node.light.as_ref().and_then(|l| l.target))
                    .flatten()
            },
            move |handle: &NodeHandle, target: Option<ObjectId>| {
                if let Some(id) = target {
                    check_target(&handle.scene().borrow(), own, id)?;
                }
                handle.update(|node| {
                    let light = (LIGHT.get_mut)(node)
                        .ok_or_else(|| ApplyError::rejected("target", "node has no light"))?;
                    light.target = target;
                    Ok(())
                })
            },
        )
    }
}

impl Builder<NodeHandle> for LightBuilder {
    fn name(&self) -> &str {
        "Light"
    }

    fn matches(&self, object: &NodeHandle) -> bool {
        LIGHT.present(object)
    }

    fn build(
        &self,
        object: &NodeHandle,
        parent: Option<&NodeHandle>,
        container: &mut dyn Container<NodeHandle>,
        consumer: &Consumer,
    ) -> Result<(), ControlError> {
        let kind = Property::enumeration(
            "kind",
            |handle: &NodeHandle| {
                handle
                    .read(|node| node.light.as_ref().map(|l| l.kind))
                    .flatten()
                    .unwrap_or_default()
            },
            |handle: &NodeHandle, kind: LightKind| {
                handle.update(|node| {
                    let light = (LIGHT.get_mut)(node)
                        .ok_or_else(|| ApplyError::rejected("kind", "node has no light"))?;
                    light.kind = kind;
                    Ok(())
                })
            },
        );
        let properties = [
            kind,
            LIGHT.property(
                "color",
                |l: &Light| l.color,
                |l: &mut Light, color: Color| {
                    l.color = color;
                    Ok(())
                },
            ),
            LIGHT.property(
                "intensity",
                |l: &Light| l.intensity,
                |l: &mut Light, intensity: f32| {
                    non_negative("intensity", intensity)?;
                    l.intensity = intensity;
                    Ok(())
                },
            ),
            LIGHT
                .property(
                    "range",
                    |l: &Light| l.range,
                    |l: &mut Light, range: f32| {
                        l.range = range;
                        Ok(())
                    },
                )
                .with_numeric_range(NumericRange::at_least(0.0)),
        ];
        for property in properties {
            append(container, object, property, consumer)?;
        }

        let Some(parent) = parent else {
            tracing::trace!("no parent context, skipping light target for {object:?}");
            return Ok(());
        };
        let mut control =
            PropertyControl::bind(object.clone(), Self::target_property(object), consumer.clone())?;
        if let Some(factory) = &self.chooser {
            let candidates = Self::candidates(object, parent, consumer);
            control.set_chooser(factory(&candidates));
        }
        container.append(control);
        Ok(())
    }
}

/// A light may only point at a sibling that has a transform.
fn check_target(scene: &Scene, own: ObjectId, id: ObjectId) -> Result<(), ApplyError> {
    if id == own {
        return Err(ApplyError::rejected("target", "a light cannot target itself"));
    }
    let Some(node) = scene.get(id) else {
        return Err(ApplyError::rejected(
            "target",
            format!("node {} is not in the scene", id.short()),
        ));
    };
    if !scene.siblings(own).contains(&id) {
        return Err(ApplyError::rejected(
            "target",
            format!("`{}` is not a sibling of the light", node.name),
        ));
    }
    if node.transform.is_none() {
        return Err(ApplyError::rejected(
            "target",
            format!("`{}` has no transform", node.name),
        ));
    }
    Ok(())
}

/// Box extents or sphere radius, whichever the shape is.
#[derive(Debug, Default)]
pub struct ShapeBuilder;

impl Builder<NodeHandle> for ShapeBuilder {
    fn name(&self) -> &str {
        "Shape"
    }

    fn matches(&self, object: &NodeHandle) -> bool {
        SHAPE.present(object)
    }

    fn build(
        &self,
        object: &NodeHandle,
        _parent: Option<&NodeHandle>,
        container: &mut dyn Container<NodeHandle>,
        consumer: &Consumer,
    ) -> Result<(), ControlError> {
        let Some(shape) = object.read(|node| node.shape).flatten() else {
            return Ok(());
        };
        let property = match shape {
            Shape::Box { .. } => SHAPE.property(
                "half_extents",
                |shape: &Shape| match shape {
                    Shape::Box { half_extents } => *half_extents,
                    Shape::Sphere { .. } => Vec3::ZERO,
                },
                |shape: &mut Shape, v: Vec3| match shape {
                    Shape::Box { half_extents } => {
                        *half_extents = v;
                        Ok(())
                    }
                    Shape::Sphere { .. } => {
                        Err(ApplyError::rejected("half_extents", "shape is not a box"))
                    }
                },
            ),
            Shape::Sphere { .. } => SHAPE.property(
                "radius",
                |shape: &Shape| match shape {
                    Shape::Sphere { radius } => *radius,
                    Shape::Box { .. } => 0.0,
                },
                |shape: &mut Shape, v: f32| match shape {
                    Shape::Sphere { radius } => {
                        *radius = v;
                        Ok(())
                    }
                    Shape::Box { .. } => Err(ApplyError::rejected("radius", "shape is not a sphere")),
                },
            ),
        };
        append(
            container,
            object,
            property.with_numeric_range(NumericRange::at_least(0.0).with_step(0.05)),
            consumer,
        )
    }
}

#[derive(Debug, Default)]
pub struct EmitterBuilder;

impl Builder<NodeHandle> for EmitterBuilder {
    fn name(&self) -> &str {
        "Emitter"
    }

    fn matches(&self, object: &NodeHandle) -> bool {
        EMITTER.present(object)
    }

    fn build(
        &self,
        object: &NodeHandle,
        _parent: Option<&NodeHandle>,
        container: &mut dyn Container<NodeHandle>,
        consumer: &Consumer,
    ) -> Result<(), ControlError> {
        let properties = [
            EMITTER.property(
                "rate",
                |e: &Emitter| e.rate,
                |e: &mut Emitter, rate: f32| {
                    non_negative("rate", rate)?;
                    e.rate = rate;
                    Ok(())
                },
            ),
            EMITTER
                .property(
                    "lifetime",
                    |e: &Emitter| e.lifetime.to_vec(),
                    |e: &mut Emitter, lifetime: Vec<f32>| match lifetime[..] {
                        [min, max] if min <= max => {
                            e.lifetime = [min, max];
                            Ok(())
                        }
                        [_, _] => Err(ApplyError::rejected("lifetime", "min exceeds max")),
                        _ => Err(ApplyError::rejected("lifetime", "expected [min, max]")),
                    },
                )
                .with_numeric_range(NumericRange::at_least(0.0)),
            EMITTER
                .property(
                    "size",
                    |e: &Emitter| e.size,
                    |e: &mut Emitter, size: Vec2| {
                        e.size = size;
                        Ok(())
                    },
                )
                .with_numeric_range(NumericRange::at_least(0.0).with_step(0.01)),
            EMITTER.property(
                "gravity",
                |e: &Emitter| e.gravity,
                |e: &mut Emitter, gravity: Vec3| {
                    e.gravity = gravity;
                    Ok(())
                },
            ),
            EMITTER
                .property(
                    "max_particles",
                    |e: &Emitter| e.max_particles,
                    |e: &mut Emitter, max: i64| {
                        e.max_particles = max;
                        Ok(())
                    },
                )
                .with_numeric_range(NumericRange::new(1.0, 100_000.0).with_step(10.0)),
        ];
        for property in properties {
            append(container, object, property, consumer)?;
        }
        Ok(())
    }
}

/// The scene builders in display order.
pub fn default_registry() -> BuilderRegistry<NodeHandle> {
    registry_with(LightBuilder::new())
}

/// Like [`default_registry`], with target controls using `factory` as their dialog.
pub fn registry_with_chooser(factory: ChooserFactory) -> BuilderRegistry<NodeHandle> {
    registry_with(LightBuilder::new().with_chooser(factory))
}

fn registry_with(light: LightBuilder) -> BuilderRegistry<NodeHandle> {
    BuilderRegistry::new()
        .with(NodeBuilder)
        .with(TransformBuilder)
        .with(light)
        .with(ShapeBuilder)
        .with(EmitterBuilder)
}

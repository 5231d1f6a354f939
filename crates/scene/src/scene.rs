use glam::{Mat4, Vec3};
use propkit_common::{Color, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SceneError;
use crate::node::{Emitter, Light, LightKind, Node, Shape, Transform};

/// A tree of nodes stored in an arena keyed by id.
///
/// Uses BTreeMap for deterministic iteration order. The root always exists
/// and cannot be removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    nodes: BTreeMap<ObjectId, Node>,
    root: ObjectId,
}

impl Scene {
    /// Create a scene holding only a root node named `root_name`.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = ObjectId::new();
        let mut nodes = BTreeMap::new();
        nodes.insert(root, Node::new(root_name));
        Self { nodes, root }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &BTreeMap<ObjectId, Node> {
        &self.nodes
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Insert `node` as the last child of `parent`. Returns the new id.
    pub fn add(&mut self, parent: ObjectId, mut node: Node) -> Result<ObjectId, SceneError> {
        let id = ObjectId::new();
        let owner = self
            .nodes
            .get_mut(&parent)
            .ok_or(SceneError::NodeNotFound(parent))?;
        owner.children.push(id);
        node.parent = Some(parent);
        node.children.clear();
        tracing::trace!("added `{}` ({}) under {}", node.name, id.short(), parent.short());
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node and its whole subtree. Returns the removed node.
    pub fn remove(&mut self, id: ObjectId) -> Result<Node, SceneError> {
        if id == self.root {
            return Err(SceneError::RootRemoval);
        }
        let node = self.nodes.remove(&id).ok_or(SceneError::NodeNotFound(id))?;
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        let mut pending = node.children.clone();
        while let Some(child) = pending.pop() {
            if let Some(removed) = self.nodes.remove(&child) {
                pending.extend(removed.children);
            }
        }
        Ok(node)
    }

    pub fn parent_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Other children of the same parent, in child order.
    pub fn siblings(&self, id: ObjectId) -> Vec<ObjectId> {
        match self.parent_of(id) {
            Some(parent) => self
                .children(parent)
                .iter()
                .copied()
                .filter(|child| *child != id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// First node with `name`, searching depth-first from the root.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.depth_first().into_iter().find(|id| {
            self.nodes
                .get(id)
                .is_some_and(|node| node.name == name)
        })
    }

    /// Node ids in depth-first order starting at the root.
    pub fn depth_first(&self) -> Vec<ObjectId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Depth of `id` below the root, or `None` if it is not in the scene.
    pub fn depth(&self, id: ObjectId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            depth += 1;
            current = parent;
        }
        Some(depth)
    }

    /// Compose local transforms from the root down. Nodes without a
    /// transform contribute identity.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Mat4> {
        let mut node = self.nodes.get(&id)?;
        let mut matrix = node.transform.map(|t| t.matrix()).unwrap_or(Mat4::IDENTITY);
        while let Some(parent) = node.parent.and_then(|p| self.nodes.get(&p)) {
            if let Some(t) = parent.transform {
                matrix = t.matrix() * matrix;
            }
            node = parent;
        }
        Some(matrix)
    }

    pub fn world_position(&self, id: ObjectId) -> Option<Vec3> {
        self.world_matrix(id)
            .map(|m| m.transform_point3(Vec3::ZERO))
    }
}

/// A small scene exercising every aspect: ground, sun, lamp, ball, sparks.
pub fn sample_scene() -> Scene {
    let mut scene = Scene::new("World");
    let root = scene.root();
    let nodes = [
        Node::new("Ground")
            .with_transform(Transform::default())
            .with_shape(Shape::Box {
                half_extents: Vec3::new(10.0, 0.1, 10.0),
            }),
        Node::new("Sun")
            .with_transform(Transform {
                rotation: Vec3::new(-45.0, 30.0, 0.0),
                ..Transform::default()
            })
            .with_light(Light {
                kind: LightKind::Directional,
                color: Color::rgb(1.0, 0.95, 0.8),
                intensity: 3.0,
                range: 0.0,
                target: None,
            }),
        Node::new("Lamp")
            .with_transform(Transform::at(Vec3::new(2.0, 3.0, 0.0)))
            .with_light(Light {
                intensity: 5.0,
                ..Light::default()
            }),
        Node::new("Ball")
            .with_transform(Transform::at(Vec3::new(0.0, 1.0, 0.0)))
            .with_shape(Shape::Sphere { radius: 0.5 }),
        Node::new("Sparks")
            .with_transform(Transform::at(Vec3::new(-2.0, 0.5, 1.0)))
            .with_emitter(Emitter::default()),
    ];
    for node in nodes {
        // The root exists for the scene's whole life.
        if let Err(err) = scene.add(root, node) {
            tracing::error!("sample scene: {err}");
        }
    }
    scene
}

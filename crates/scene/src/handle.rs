use propkit_common::ObjectId;
use propkit_history::ApplyError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::SceneError;
use crate::node::Node;
use crate::scene::Scene;

/// A scene shared between the host and every control editing it.
pub type SharedScene = Rc<RefCell<Scene>>;

pub fn share(scene: Scene) -> SharedScene {
    Rc::new(RefCell::new(scene))
}

/// The editable object handle: one node of one shared scene.
///
/// Handles stay valid after their node is removed; reads then yield `None`
/// and writes fail with [`ApplyError::TargetMissing`].
#[derive(Clone)]
pub struct NodeHandle {
    scene: SharedScene,
    id: ObjectId,
}

impl NodeHandle {
    pub fn new(scene: &SharedScene, id: ObjectId) -> Self {
        Self {
            scene: scene.clone(),
            id,
        }
    }

    pub fn root(scene: &SharedScene) -> Self {
        let id = scene.borrow().root();
        Self::new(scene, id)
    }

    pub fn find(scene: &SharedScene, name: &str) -> Result<Self, SceneError> {
        let id = scene
            .borrow()
            .find(name)
            .ok_or_else(|| SceneError::UnknownName(name.to_string()))?;
        Ok(Self::new(scene, id))
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn scene(&self) -> &SharedScene {
        &self.scene
    }

    pub fn exists(&self) -> bool {
        self.scene.borrow().contains(self.id)
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        let parent = self.scene.borrow().parent_of(self.id)?;
        Some(Self::new(&self.scene, parent))
    }

    pub fn name(&self) -> String {
        self.read(|node| node.name.clone()).unwrap_or_default()
    }

    /// Run `f` against the node, or return `None` if it was removed.
    pub fn read<R>(&self, f: impl FnOnce(&Node) -> R) -> Option<R> {
        self.scene.borrow().get(self.id).map(f)
    }

    /// Run `f` against the node mutably.
    pub fn update<R>(
        &self,
        f: impl FnOnce(&mut Node) -> Result<R, ApplyError>,
    ) -> Result<R, ApplyError> {
        let mut scene = self.scene.borrow_mut();
        let node = scene.get_mut(self.id).ok_or(ApplyError::TargetMissing)?;
        f(node)
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.scene, &other.scene)
    }
}

impl Eq for NodeHandle {}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHandle({})", self.id.short())
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::sample_scene;

    #[test]
    fn handles_compare_by_scene_and_id() {
        let scene = share(sample_scene());
        let other = share(scene.borrow().clone());
        let lamp = NodeHandle::find(&scene, "Lamp").unwrap();
        assert_eq!(lamp, NodeHandle::new(&scene, lamp.id()));
        assert_ne!(lamp, NodeHandle::new(&other, lamp.id()));
    }

    #[test]
    fn removed_node_reads_none_and_rejects_writes() {
        let scene = share(sample_scene());
        let ball = NodeHandle::find(&scene, "Ball").unwrap();
        scene.borrow_mut().remove(ball.id()).unwrap();

        assert!(!ball.exists());
        assert!(ball.read(|node| node.visible).is_none());
        let write = ball.update(|node| {
            node.visible = false;
            Ok(())
        });
        assert_eq!(write, Err(ApplyError::TargetMissing));
    }

    #[test]
    fn parent_of_top_level_node_is_root() {
        let scene = share(sample_scene());
        let sun = NodeHandle::find(&scene, "Sun").unwrap();
        assert_eq!(sun.parent(), Some(NodeHandle::root(&scene)));
        assert!(NodeHandle::root(&scene).parent().is_none());
        assert_eq!(sun.to_string(), format!("Sun ({})", sun.id().short()));
    }

    #[test]
    fn unknown_names_are_reported() {
        let scene = share(sample_scene());
        assert_eq!(
            NodeHandle::find(&scene, "Moon"),
            Err(SceneError::UnknownName("Moon".into()))
        );
    }
}

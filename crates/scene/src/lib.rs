//! Sample scene model edited through propkit: a node tree whose optional
//! aspects (transform, light, shape, emitter) each get a builder.
//!
//! # Invariants
//! - The root node always exists.
//! - Every mutation made by a control goes through [`NodeHandle::update`].
//! - Light intensity and emitter rate are never negative.

pub mod builders;
mod error;
mod handle;
mod node;
mod scene;
pub mod scenarios;

pub use builders::{
    ChooserFactory, EmitterBuilder, LightBuilder, NodeBuilder, ShapeBuilder, TransformBuilder,
    default_registry, registry_with_chooser,
};
pub use error::SceneError;
pub use handle::{NodeHandle, SharedScene, share};
pub use node::{Emitter, Light, LightKind, Node, Shape, Transform};
pub use scene::{Scene, sample_scene};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}

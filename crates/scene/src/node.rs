use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use propkit_common::{Color, EditableEnum, ObjectId};
use serde::{Deserialize, Serialize};

/// Local placement of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in degrees, applied X then Y then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn orientation(&self) -> Quat {
        let r = self.rotation;
        Quat::from_euler(
            EulerRot::XYZ,
            r.x.to_radians(),
            r.y.to_radians(),
            r.z.to_radians(),
        )
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.translation)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    #[default]
    Point,
    Spot,
    Directional,
    Ambient,
}

impl EditableEnum for LightKind {
    const VARIANTS: &'static [&'static str] = &["point", "spot", "directional", "ambient"];

    fn variant_name(self) -> &'static str {
        match self {
            LightKind::Point => "point",
            LightKind::Spot => "spot",
            LightKind::Directional => "directional",
            LightKind::Ambient => "ambient",
        }
    }

    fn from_variant(name: &str) -> Option<Self> {
        match name {
            "point" => Some(LightKind::Point),
            "spot" => Some(LightKind::Spot),
            "directional" => Some(LightKind::Directional),
            "ambient" => Some(LightKind::Ambient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    /// Never negative.
    pub intensity: f32,
    pub range: f32,
    /// Node the light points at, if any. Must be a sibling in the scene.
    pub target: Option<ObjectId>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            color: Color::WHITE,
            intensity: 1.0,
            range: 10.0,
            target: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    /// Particles per second, never negative.
    pub rate: f32,
    /// `[min, max]` particle lifetime in seconds.
    pub lifetime: [f32; 2],
    pub size: Vec2,
    pub gravity: Vec3,
    pub max_particles: i64,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            rate: 10.0,
            lifetime: [1.0, 2.0],
            size: Vec2::splat(0.1),
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_particles: 1000,
        }
    }
}

/// One object in the scene. Optional aspects decide which builders apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub visible: bool,
    /// Render layer indices in `0..32`.
    pub layers: Vec<i64>,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    pub transform: Option<Transform>,
    pub light: Option<Light>,
    pub shape: Option<Shape>,
    pub emitter: Option<Emitter>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            layers: vec![0],
            parent: None,
            children: Vec::new(),
            transform: None,
            light: None,
            shape: None,
            emitter: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Aspect names present on this node, in a fixed order.
    pub fn aspects(&self) -> Vec<&'static str> {
        let mut aspects = Vec::new();
        if self.transform.is_some() {
            aspects.push("transform");
        }
        if self.light.is_some() {
            aspects.push("light");
        }
        if self.shape.is_some() {
            aspects.push("shape");
        }
        if self.emitter.is_some() {
            aspects.push("emitter");
        }
        aspects
    }
}

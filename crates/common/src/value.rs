use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Color, ObjectId};

/// The closed set of value domains a property can be edited in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Enum,
    Vec2,
    Vec3,
    Color,
    FloatArray,
    IntArray,
    Reference,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Enum => "enum",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Color => "color",
            Self::FloatArray => "float[]",
            Self::IntArray => "int[]",
            Self::Reference => "reference",
        }
    }

    /// Kinds whose components can be clamped to a numeric range.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Float | Self::Vec2 | Self::Vec3 | Self::FloatArray | Self::IntArray
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A type-erased property value.
///
/// Controls, operations and the undo history only ever move values of this
/// type; typed accessors convert through [`EditableValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Text(String),
    /// Variant name of an enumeration; the allowed names live on the property.
    Enum(String),
    Vec2(Vec2),
    Vec3(Vec3),
    Color(Color),
    FloatArray(Vec<f32>),
    IntArray(Vec<i64>),
    /// Reference to another object. `None` is a valid "no value" state.
    Reference(Option<ObjectId>),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Enum(_) => ValueKind::Enum,
            Self::Vec2(_) => ValueKind::Vec2,
            Self::Vec3(_) => ValueKind::Vec3,
            Self::Color(_) => ValueKind::Color,
            Self::FloatArray(_) => ValueKind::FloatArray,
            Self::IntArray(_) => ValueKind::IntArray,
            Self::Reference(_) => ValueKind::Reference,
        }
    }

    /// True for a reference holding no object.
    pub fn is_empty_reference(&self) -> bool {
        matches!(self, Self::Reference(None))
    }

    /// True if any float component is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        match self {
            Self::Float(v) => !v.is_finite(),
            Self::Vec2(v) => !v.is_finite(),
            Self::Vec3(v) => !v.is_finite(),
            Self::Color(c) => c.to_array().iter().any(|v| !v.is_finite()),
            Self::FloatArray(values) => values.iter().any(|v| !v.is_finite()),
            _ => false,
        }
    }

    /// Typed view of this value, `None` if the kinds differ.
    pub fn get<T: EditableValue>(&self) -> Option<T> {
        T::from_value(self)
    }

    /// Parse user-entered text into a value of the given kind.
    ///
    /// Vectors, colors and arrays accept comma or whitespace separated
    /// components, optionally wrapped in `()` or `[]`. Colors accept three
    /// components (opaque) or four.
    pub fn parse(kind: ValueKind, input: &str) -> Result<Self, ParseValueError> {
        let text = input.trim();
        let invalid = || ParseValueError::Invalid {
            kind,
            input: input.to_string(),
        };
        match kind {
            ValueKind::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Self::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Self::Bool(false)),
                _ => Err(invalid()),
            },
            ValueKind::Int => text.parse().map(Self::Int).map_err(|_| invalid()),
            ValueKind::Float => parse_float(text).map(Self::Float).ok_or_else(invalid),
            ValueKind::Text => Ok(Self::Text(input.to_string())),
            ValueKind::Enum => {
                if text.is_empty() {
                    Err(invalid())
                } else {
                    Ok(Self::Enum(text.to_string()))
                }
            }
            ValueKind::Vec2 => {
                let c = parse_floats(kind, input, Some(2))?;
                Ok(Self::Vec2(Vec2::new(c[0], c[1])))
            }
            ValueKind::Vec3 => {
                let c = parse_floats(kind, input, Some(3))?;
                Ok(Self::Vec3(Vec3::new(c[0], c[1], c[2])))
            }
            ValueKind::Color => {
                let c = parse_floats(kind, input, None)?;
                match c.as_slice() {
                    [r, g, b] => Ok(Self::Color(Color::rgb(*r, *g, *b))),
                    [r, g, b, a] => Ok(Self::Color(Color::rgba(*r, *g, *b, *a))),
                    _ => Err(ParseValueError::Arity {
                        kind,
                        expected: 4,
                        found: c.len(),
                    }),
                }
            }
            ValueKind::FloatArray => parse_floats(kind, input, None).map(Self::FloatArray),
            ValueKind::IntArray => components(input)
                .map(|part| part.parse::<i64>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::IntArray),
            ValueKind::Reference => match text {
                "" | "none" | "null" => Ok(Self::Reference(None)),
                _ => text
                    .parse::<ObjectId>()
                    .map(|id| Self::Reference(Some(id)))
                    .map_err(|_| invalid()),
            },
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Enum(v) => f.write_str(v),
            Self::Vec2(v) => write!(f, "({}, {})", v.x, v.y),
            Self::Vec3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Self::Color(c) => write!(f, "({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            Self::FloatArray(values) => write_list(f, values),
            Self::IntArray(values) => write_list(f, values),
            Self::Reference(Some(id)) => write!(f, "{id}"),
            Self::Reference(None) => f.write_str("none"),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v}")?;
    }
    f.write_str("]")
}

fn components(input: &str) -> impl Iterator<Item = &str> {
    let inner = input
        .trim()
        .trim_start_matches(['(', '['])
        .trim_end_matches([')', ']']);
    let by_comma = inner.contains(',');
    inner
        .split(move |c: char| if by_comma { c == ',' } else { c.is_whitespace() })
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

fn parse_float(text: &str) -> Option<f32> {
    text.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_floats(
    kind: ValueKind,
    input: &str,
    arity: Option<usize>,
) -> Result<Vec<f32>, ParseValueError> {
    let values = components(input)
        .map(|part| {
            parse_float(part).ok_or_else(|| ParseValueError::Invalid {
                kind,
                input: input.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(expected) = arity {
        if values.len() != expected {
            return Err(ParseValueError::Arity {
                kind,
                expected,
                found: values.len(),
            });
        }
    }
    Ok(values)
}

/// Errors from parsing entered text into a [`PropertyValue`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseValueError {
    #[error("cannot read {input:?} as {kind}")]
    Invalid { kind: ValueKind, input: String },
    #[error("{kind} needs {expected} components, found {found}")]
    Arity {
        kind: ValueKind,
        expected: usize,
        found: usize,
    },
}

/// A Rust type that maps onto exactly one [`ValueKind`].
///
/// Typed accessors built from these conversions cannot disagree with their
/// declared kind.
pub trait EditableValue: Clone + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> PropertyValue;

    fn from_value(value: &PropertyValue) -> Option<Self>;
}

macro_rules! editable_value {
    ($ty:ty, $kind:ident) => {
        impl EditableValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn into_value(self) -> PropertyValue {
                PropertyValue::$kind(self)
            }

            fn from_value(value: &PropertyValue) -> Option<Self> {
                match value {
                    PropertyValue::$kind(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

editable_value!(bool, Bool);
editable_value!(i64, Int);
editable_value!(f32, Float);
editable_value!(String, Text);
editable_value!(Vec2, Vec2);
editable_value!(Vec3, Vec3);
editable_value!(Color, Color);
editable_value!(Vec<f32>, FloatArray);
editable_value!(Vec<i64>, IntArray);
editable_value!(Option<ObjectId>, Reference);

impl EditableValue for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Int(self.into())
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

/// A fieldless Rust enum editable as [`PropertyValue::Enum`].
///
/// `VARIANTS` is the declared domain; controls refuse any other name.
pub trait EditableEnum: Copy + 'static {
    const VARIANTS: &'static [&'static str];

    fn variant_name(self) -> &'static str;

    fn from_variant(name: &str) -> Option<Self>;
}

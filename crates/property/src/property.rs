use glam::{Vec2, Vec3};
use propkit_common::{EditableEnum, EditableValue, PropertyValue, ValueKind};
use propkit_history::{ApplyError, Mutator};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Reads the current value of a property from an object.
type Getter<O> = Rc<dyn Fn(&O) -> PropertyValue>;

/// Inclusive bounds for numeric input, applied per component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
    /// Drag/scroll increment shown by widgets. Does not affect validation.
    pub step: f64,
}

impl NumericRange {
    /// Bounds with a step of one hundredth of the span. Reversed bounds are swapped.
    pub fn new(min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let span = max - min;
        Self {
            min,
            max,
            step: if span > 0.0 && span.is_finite() {
                span / 100.0
            } else {
                0.1
            },
        }
    }

    /// Lower bound only.
    pub fn at_least(min: f64) -> Self {
        Self {
            step: 0.1,
            ..Self::new(min, f64::MAX)
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    fn clamp_f32(&self, v: f32) -> f32 {
        (f64::from(v)).max(self.min).min(self.max) as f32
    }

    fn clamp_i64(&self, v: i64) -> i64 {
        let min = if self.min <= i64::MIN as f64 {
            i64::MIN
        } else {
            self.min.ceil() as i64
        };
        let max = if self.max >= i64::MAX as f64 {
            i64::MAX
        } else {
            self.max.floor() as i64
        };
        v.max(min).min(max)
    }

    /// Clamp every numeric component of `value`; other kinds pass through.
    pub fn clamp(&self, value: PropertyValue) -> PropertyValue {
        match value {
            PropertyValue::Int(v) => PropertyValue::Int(self.clamp_i64(v)),
            PropertyValue::Float(v) => PropertyValue::Float(self.clamp_f32(v)),
            PropertyValue::Vec2(v) => {
                PropertyValue::Vec2(Vec2::new(self.clamp_f32(v.x), self.clamp_f32(v.y)))
            }
            PropertyValue::Vec3(v) => PropertyValue::Vec3(Vec3::new(
                self.clamp_f32(v.x),
                self.clamp_f32(v.y),
                self.clamp_f32(v.z),
            )),
            PropertyValue::FloatArray(values) => PropertyValue::FloatArray(
                values.into_iter().map(|v| self.clamp_f32(v)).collect(),
            ),
            PropertyValue::IntArray(values) => PropertyValue::IntArray(
                values.into_iter().map(|v| self.clamp_i64(v)).collect(),
            ),
            other => other,
        }
    }
}

/// Per-property editing options.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyOptions {
    /// Numeric bounds; input outside them is clamped before the dirty check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<NumericRange>,
    /// Allowed variant names for enum properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Vec<String>>,
    pub read_only: bool,
    /// A reference property that must always point at an object.
    pub required: bool,
}

/// A named, typed slot on a domain object with its accessor pair.
pub struct Property<O> {
    name: String,
    kind: ValueKind,
    getter: Getter<O>,
    setter: Mutator<O>,
    options: PropertyOptions,
}

impl<O> Clone for Property<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            getter: self.getter.clone(),
            setter: self.setter.clone(),
            options: self.options.clone(),
        }
    }
}

impl<O> fmt::Debug for Property<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<O: 'static> Property<O> {
    /// Property backed by strongly typed accessors; its kind is `T::KIND`.
    pub fn typed<T, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        T: EditableValue,
        G: Fn(&O) -> T + 'static,
        S: Fn(&O, T) -> Result<(), ApplyError> + 'static,
    {
        let name = name.into();
        let property = name.clone();
        Self {
            name,
            kind: T::KIND,
            getter: Rc::new(move |object: &O| get(object).into_value()),
            setter: Rc::new(move |object: &O, value: &PropertyValue| {
                let typed = T::from_value(value).ok_or_else(|| ApplyError::KindMismatch {
                    property: property.clone(),
                    expected: T::KIND,
                    found: value.kind(),
                })?;
                set(object, typed)
            }),
            options: PropertyOptions::default(),
        }
    }

    /// Enum property whose domain is `E::VARIANTS`.
    pub fn enumeration<E, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        E: EditableEnum,
        G: Fn(&O) -> E + 'static,
        S: Fn(&O, E) -> Result<(), ApplyError> + 'static,
    {
        let name = name.into();
        let property = name.clone();
        Self {
            name,
            kind: ValueKind::Enum,
            getter: Rc::new(move |object: &O| {
                PropertyValue::Enum(get(object).variant_name().into())
            }),
            setter: Rc::new(move |object: &O, value: &PropertyValue| {
                let PropertyValue::Enum(variant) = value else {
                    return Err(ApplyError::KindMismatch {
                        property: property.clone(),
                        expected: ValueKind::Enum,
                        found: value.kind(),
                    });
                };
                let typed = E::from_variant(variant).ok_or_else(|| {
                    ApplyError::rejected(property.clone(), format!("unknown variant `{variant}`"))
                })?;
                set(object, typed)
            }),
            options: PropertyOptions {
                domain: Some(E::VARIANTS.iter().map(|v| v.to_string()).collect()),
                ..PropertyOptions::default()
            },
        }
    }

    /// Property backed by value-level accessors.
    ///
    /// Nothing ties the getter to `kind` at compile time; binding a control
    /// checks the getter's first value against it. An enum property built
    /// this way needs [`with_domain`](Self::with_domain) before it can bind.
    pub fn dynamic<G, S>(name: impl Into<String>, kind: ValueKind, get: G, set: S) -> Self
    where
        G: Fn(&O) -> PropertyValue + 'static,
        S: Fn(&O, &PropertyValue) -> Result<(), ApplyError> + 'static,
    {
        Self {
            name: name.into(),
            kind,
            getter: Rc::new(get),
            setter: Rc::new(set),
            options: PropertyOptions::default(),
        }
    }
}

impl<O> Property<O> {
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.options.range = Some(NumericRange::new(min, max));
        self
    }

    pub fn with_numeric_range(mut self, range: NumericRange) -> Self {
        self.options.range = Some(range);
        self
    }

    pub fn with_domain<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.domain = Some(variants.into_iter().map(Into::into).collect());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.options.read_only = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.options.required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn options(&self) -> &PropertyOptions {
        &self.options
    }

    /// Read the property from `object`.
    pub fn get(&self, object: &O) -> PropertyValue {
        (self.getter)(object)
    }

    /// Write `value` into `object` directly, bypassing any history.
    pub fn set(&self, object: &O, value: &PropertyValue) -> Result<(), ApplyError> {
        (self.setter)(object, value)
    }

    pub fn setter(&self) -> Mutator<O> {
        self.setter.clone()
    }
}

//! Typed key → value property storage with per-type schemas.
//!
//! Every value is a small fixed-size float vector tagged with its arity
//! (1, 2 or 3). A [`PropertySchema`] lists the keys an entity type accepts,
//! the arity and unit of each key, and its default value.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest arity a property value may have.
pub const MAX_ARITY: usize = 3;

/// Errors from property validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    #[error("unknown property '{key}'")]
    UnknownProperty { key: String },
    #[error("property '{key}' expects {expected} value(s), got {actual}")]
    ArityMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid value for property '{key}': {reason}")]
    InvalidValue { key: String, reason: &'static str },
    #[error("property values must have 1 to {MAX_ARITY} components, got {0}")]
    InvalidArity(usize),
}

/// A 1-, 2- or 3-component float vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    values: [f32; MAX_ARITY],
    arity: u8,
}

impl PropertyValue {
    pub const fn scalar(x: f32) -> Self {
        Self {
            values: [x, 0.0, 0.0],
            arity: 1,
        }
    }

    pub const fn vec2(x: f32, y: f32) -> Self {
        Self {
            values: [x, y, 0.0],
            arity: 2,
        }
    }

    pub const fn vec3(x: f32, y: f32, z: f32) -> Self {
        Self {
            values: [x, y, z],
            arity: 3,
        }
    }

    /// Build a value from a slice of 1 to 3 components.
    pub fn from_slice(values: &[f32]) -> Result<Self, PropertyError> {
        match *values {
            [x] => Ok(Self::scalar(x)),
            [x, y] => Ok(Self::vec2(x, y)),
            [x, y, z] => Ok(Self::vec3(x, y, z)),
            _ => Err(PropertyError::InvalidArity(values.len())),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity as usize
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.arity()]
    }

    /// First component.
    pub fn x(&self) -> f32 {
        self.values[0]
    }

    pub fn to_vec2(&self) -> Vec2 {
        Vec2::new(self.values[0], self.values[1])
    }

    pub fn to_vec3(&self) -> Vec3 {
        Vec3::from_array(self.values)
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.as_slice().iter().map(|v| format!("{v}")).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// What a property's components mean, and which values are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyUnit {
    /// Any finite float.
    Scalar,
    /// A float in `[0, 1]`.
    UnitInterval,
    Position,
    /// Degrees.
    Angle,
    Color,
    /// A non-negative integer.
    Count,
    /// An integer greater than zero.
    PositiveCount,
    /// 0 or 1.
    Flag,
    /// An integer in `0..n`.
    Choice(u32),
}

impl PropertyUnit {
    fn check(self, v: f32) -> Result<(), &'static str> {
        if !v.is_finite() {
            return Err("value must be finite");
        }
        let integral = v.fract() == 0.0;
        match self {
            Self::Scalar | Self::Position | Self::Angle => Ok(()),
            Self::UnitInterval if !(0.0..=1.0).contains(&v) => Err("value must be within [0, 1]"),
            Self::Color if v < 0.0 => Err("color components must not be negative"),
            Self::Count if !integral || v < 0.0 => Err("value must be a non-negative integer"),
            Self::PositiveCount if !integral || v < 1.0 => Err("value must be a positive integer"),
            Self::Flag if v != 0.0 && v != 1.0 => Err("value must be 0 or 1"),
            Self::Choice(n) if !integral || v < 0.0 || v >= n as f32 => {
                Err("value is not one of the allowed choices")
            }
            _ => Ok(()),
        }
    }
}

/// Declaration of one recognized property key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySpec {
    pub key: &'static str,
    pub unit: PropertyUnit,
    pub default: PropertyValue,
}

impl PropertySpec {
    pub const fn new(key: &'static str, unit: PropertyUnit, default: PropertyValue) -> Self {
        Self { key, unit, default }
    }

    pub fn arity(&self) -> usize {
        self.default.arity()
    }
}

/// The set of keys an entity type recognizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySchema {
    specs: &'static [PropertySpec],
}

impl PropertySchema {
    pub const EMPTY: Self = Self { specs: &[] };

    pub const fn new(specs: &'static [PropertySpec]) -> Self {
        Self { specs }
    }

    pub fn spec(&self, key: &str) -> Option<&PropertySpec> {
        self.specs.iter().find(|s| s.key == key)
    }

    pub fn specs(&self) -> &[PropertySpec] {
        self.specs
    }

    /// Check `value` against the declaration of `key`.
    pub fn validate(&self, key: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        let spec = self
            .spec(key)
            .ok_or_else(|| PropertyError::UnknownProperty { key: key.into() })?;
        if spec.arity() != value.arity() {
            return Err(PropertyError::ArityMismatch {
                key: key.into(),
                expected: spec.arity(),
                actual: value.arity(),
            });
        }
        for &v in value.as_slice() {
            spec.unit
                .check(v)
                .map_err(|reason| PropertyError::InvalidValue {
                    key: key.into(),
                    reason,
                })?;
        }
        Ok(())
    }

    /// A store holding every key at its default value.
    pub fn defaults(&self) -> PropertyStore {
        let mut store = PropertyStore::new();
        for spec in self.specs {
            store.entries.insert(spec.key.to_string(), spec.default);
        }
        store
    }

    /// Validate and write one value into `store`. Last write wins.
    pub fn apply(
        &self,
        store: &mut PropertyStore,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), PropertyError> {
        self.validate(key, &value)?;
        store.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Property values attached to one entity.
///
/// Uses BTreeMap so listings come out in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyStore {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    pub fn scalar_or(&self, key: &str, fallback: f32) -> f32 {
        self.get(key).map_or(fallback, PropertyValue::x)
    }

    pub fn vec2_or(&self, key: &str, fallback: Vec2) -> Vec2 {
        self.get(key).map_or(fallback, PropertyValue::to_vec2)
    }

    pub fn vec3_or(&self, key: &str, fallback: Vec3) -> Vec3 {
        self.get(key).map_or(fallback, PropertyValue::to_vec3)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

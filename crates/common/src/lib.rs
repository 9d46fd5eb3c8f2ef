//! Shared types for the raystage engine: math primitives and the typed
//! property store every entity carries.

pub mod property;
pub mod types;

pub use property::{
    PropertyError, PropertySchema, PropertySpec, PropertyStore, PropertyUnit, PropertyValue,
};
pub use types::{Aabb, Color, Ray, RotateOrder, Transform, TransformOrder};

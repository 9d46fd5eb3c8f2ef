//! Property schemas of the engine's own entity types.
//!
//! Shader schemas come from the shader types themselves.

use raystage_common::{PropertySchema, PropertySpec, PropertyUnit, PropertyValue};

pub const PERSPECTIVE_CAMERA: &str = "PerspectiveCamera";
pub const POINT_LIGHT: &str = "PointLight";
/// Type name recorded for renderers, which are created without one.
pub const RENDERER: &str = "Renderer";

const PERSPECTIVE_CAMERA_SPECS: &[PropertySpec] = &[
    PropertySpec::new(
        "translate",
        PropertyUnit::Position,
        PropertyValue::vec3(0.0, 0.0, 0.0),
    ),
    PropertySpec::new(
        "rotate",
        PropertyUnit::Angle,
        PropertyValue::vec3(0.0, 0.0, 0.0),
    ),
    PropertySpec::new("fov", PropertyUnit::Angle, PropertyValue::scalar(30.0)),
    PropertySpec::new("znear", PropertyUnit::Scalar, PropertyValue::scalar(0.01)),
    PropertySpec::new("zfar", PropertyUnit::Scalar, PropertyValue::scalar(1000.0)),
];

const POINT_LIGHT_SPECS: &[PropertySpec] = &[
    PropertySpec::new(
        "position",
        PropertyUnit::Position,
        PropertyValue::vec3(0.0, 0.0, 0.0),
    ),
    PropertySpec::new(
        "color",
        PropertyUnit::Color,
        PropertyValue::vec3(1.0, 1.0, 1.0),
    ),
    PropertySpec::new("intensity", PropertyUnit::Scalar, PropertyValue::scalar(1.0)),
];

const INSTANCE_SPECS: &[PropertySpec] = &[
    PropertySpec::new(
        "translate",
        PropertyUnit::Position,
        PropertyValue::vec3(0.0, 0.0, 0.0),
    ),
    PropertySpec::new(
        "rotate",
        PropertyUnit::Angle,
        PropertyValue::vec3(0.0, 0.0, 0.0),
    ),
    PropertySpec::new(
        "scale",
        PropertyUnit::Scalar,
        PropertyValue::vec3(1.0, 1.0, 1.0),
    ),
    PropertySpec::new(
        "transform_order",
        PropertyUnit::Choice(6),
        PropertyValue::scalar(0.0),
    ),
    PropertySpec::new("rotate_order", PropertyUnit::Choice(6), PropertyValue::scalar(0.0)),
];

const RENDERER_SPECS: &[PropertySpec] = &[
    PropertySpec::new(
        "resolution",
        PropertyUnit::PositiveCount,
        PropertyValue::vec2(320.0, 240.0),
    ),
    PropertySpec::new(
        "pixelsamples",
        PropertyUnit::PositiveCount,
        PropertyValue::vec2(3.0, 3.0),
    ),
    PropertySpec::new(
        "sample_jitter",
        PropertyUnit::UnitInterval,
        PropertyValue::scalar(1.0),
    ),
    PropertySpec::new("max_reflect_depth", PropertyUnit::Count, PropertyValue::scalar(3.0)),
    PropertySpec::new("max_refract_depth", PropertyUnit::Count, PropertyValue::scalar(3.0)),
    PropertySpec::new("cast_shadow", PropertyUnit::Flag, PropertyValue::scalar(1.0)),
    PropertySpec::new(
        "background",
        PropertyUnit::Color,
        PropertyValue::vec3(0.0, 0.0, 0.0),
    ),
];

pub const INSTANCE_SCHEMA: PropertySchema = PropertySchema::new(INSTANCE_SPECS);
pub const RENDERER_SCHEMA: PropertySchema = PropertySchema::new(RENDERER_SPECS);

pub fn camera_schema(type_name: &str) -> Option<PropertySchema> {
    (type_name == PERSPECTIVE_CAMERA).then_some(PropertySchema::new(PERSPECTIVE_CAMERA_SPECS))
}

pub fn light_schema(type_name: &str) -> Option<PropertySchema> {
    (type_name == POINT_LIGHT).then_some(PropertySchema::new(POINT_LIGHT_SPECS))
}

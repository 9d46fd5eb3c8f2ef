use crate::shader::{Radiance, ShaderType, SurfaceHit, SurfaceShader, Tracer};
use raystage_common::{
    Color, PropertySchema, PropertySpec, PropertyStore, PropertyUnit, PropertyValue,
};
use std::sync::Arc;

const SPECS: &[PropertySpec] = &[PropertySpec::new(
    "diffuse",
    PropertyUnit::Color,
    PropertyValue::vec3(1.0, 1.0, 1.0),
)];

/// Unlit shader: every hit returns the `diffuse` color.
#[derive(Debug, Default)]
pub struct ConstantShader;

struct Constant {
    diffuse: Color,
}

impl ShaderType for ConstantShader {
    fn name(&self) -> &str {
        "ConstantShader"
    }

    fn schema(&self) -> PropertySchema {
        PropertySchema::new(SPECS)
    }

    fn bind(&self, params: &PropertyStore) -> Arc<dyn SurfaceShader> {
        Arc::new(Constant {
            diffuse: params.vec3_or("diffuse", Color::ONE),
        })
    }
}

impl SurfaceShader for Constant {
    fn shade(&self, _hit: &SurfaceHit, _tracer: &dyn Tracer) -> Radiance {
        Radiance::opaque(self.diffuse)
    }
}

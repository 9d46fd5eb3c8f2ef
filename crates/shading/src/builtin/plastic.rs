use super::direct_lighting;
use crate::shader::{Radiance, ShaderType, SurfaceHit, SurfaceShader, Tracer, reflect};
use raystage_common::{
    Color, PropertySchema, PropertySpec, PropertyStore, PropertyUnit, PropertyValue,
};
use std::sync::Arc;

const SPECS: &[PropertySpec] = &[
    PropertySpec::new(
        "diffuse",
        PropertyUnit::Color,
        PropertyValue::vec3(0.8, 0.8, 0.8),
    ),
    PropertySpec::new(
        "specular",
        PropertyUnit::Color,
        PropertyValue::vec3(1.0, 1.0, 1.0),
    ),
    PropertySpec::new(
        "ambient",
        PropertyUnit::Color,
        PropertyValue::vec3(0.0, 0.0, 0.0),
    ),
    PropertySpec::new("roughness", PropertyUnit::UnitInterval, PropertyValue::scalar(0.1)),
    PropertySpec::new("reflect", PropertyUnit::UnitInterval, PropertyValue::scalar(0.0)),
];

/// Opaque diffuse surface with a Phong highlight and optional mirror reflection.
#[derive(Debug, Default)]
pub struct PlasticShader;

struct Plastic {
    diffuse: Color,
    specular: Color,
    ambient: Color,
    roughness: f32,
    reflect: f32,
}

impl ShaderType for PlasticShader {
    fn name(&self) -> &str {
        "PlasticShader"
    }

    fn schema(&self) -> PropertySchema {
        PropertySchema::new(SPECS)
    }

    fn bind(&self, params: &PropertyStore) -> Arc<dyn SurfaceShader> {
        Arc::new(Plastic {
            diffuse: params.vec3_or("diffuse", Color::splat(0.8)),
            specular: params.vec3_or("specular", Color::ONE),
            ambient: params.vec3_or("ambient", Color::ZERO),
            roughness: params.scalar_or("roughness", 0.1),
            reflect: params.scalar_or("reflect", 0.0),
        })
    }
}

impl SurfaceShader for Plastic {
    fn shade(&self, hit: &SurfaceHit, tracer: &dyn Tracer) -> Radiance {
        let mut color = self.ambient
            + direct_lighting(hit, tracer, self.diffuse, self.specular, self.roughness);

        if self.reflect > 0.0 {
            let dir = reflect(hit.incident, hit.normal);
            if let Some(mirrored) = tracer.trace_reflection(hit, dir) {
                color += mirrored.color * self.reflect;
            }
        }

        Radiance::opaque(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::testing::{StubTracer, head_on_hit};

    #[test]
    fn unlit_surface_shows_only_ambient() {
        let ty = PlasticShader;
        let mut params = ty.schema().defaults();
        ty.schema()
            .apply(&mut params, "ambient", PropertyValue::vec3(0.1, 0.1, 0.1))
            .unwrap();
        let mut tracer = StubTracer::new(0);
        tracer.lights.clear();
        let out = ty.evaluate(&params, &head_on_hit(), &tracer);
        assert!((out.color - Color::splat(0.1)).length() < 1e-6);
    }

    #[test]
    fn overhead_light_gives_full_diffuse() {
        let ty = PlasticShader;
        let mut params = ty.schema().defaults();
        ty.schema()
            .apply(&mut params, "specular", PropertyValue::vec3(0.0, 0.0, 0.0))
            .unwrap();
        let tracer = StubTracer::new(0);
        let out = ty.evaluate(&params, &head_on_hit(), &tracer);
        assert!((out.color - Color::splat(0.8)).length() < 1e-6);
    }

    #[test]
    fn no_reflection_rays_without_reflect_weight() {
        let ty = PlasticShader;
        let params = ty.schema().defaults();
        let tracer = StubTracer::new(8);
        ty.evaluate(&params, &head_on_hit(), &tracer);
        assert_eq!(tracer.reflections.get(), 0);
    }

    #[test]
    fn reflection_adds_environment() {
        let ty = PlasticShader;
        let mut params = ty.schema().defaults();
        ty.schema()
            .apply(&mut params, "reflect", PropertyValue::scalar(0.5))
            .unwrap();
        let shallow = ty.evaluate(&params, &head_on_hit(), &StubTracer::new(0));
        let deep_tracer = StubTracer::new(1);
        let deep = ty.evaluate(&params, &head_on_hit(), &deep_tracer);
        assert_eq!(deep_tracer.reflections.get(), 1);
        assert!((deep.color - shallow.color - Color::new(0.0, 0.0, 2.5)).length() < 1e-5);
    }
}

use super::direct_lighting;
use crate::shader::{
    Radiance, ShaderType, SurfaceHit, SurfaceShader, Tracer, fresnel_schlick, reflect, refract,
};
use raystage_common::{
    Color, PropertySchema, PropertySpec, PropertyStore, PropertyUnit, PropertyValue,
};
use std::sync::Arc;

const SPECS: &[PropertySpec] = &[
    PropertySpec::new(
        "diffuse",
        PropertyUnit::Color,
        PropertyValue::vec3(0.0, 0.0, 0.0),
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
    PropertySpec::new(
        "filter_color",
        PropertyUnit::Color,
        PropertyValue::vec3(1.0, 1.0, 1.0),
    ),
    PropertySpec::new("roughness", PropertyUnit::UnitInterval, PropertyValue::scalar(0.05)),
    PropertySpec::new("ior", PropertyUnit::Scalar, PropertyValue::scalar(1.4)),
];

/// Dielectric: Fresnel-weighted reflection and refraction tinted by
/// `filter_color`, on top of a direct-lighting highlight.
#[derive(Debug, Default)]
pub struct GlassShader;

struct Glass {
    diffuse: Color,
    specular: Color,
    ambient: Color,
    filter_color: Color,
    roughness: f32,
    ior: f32,
}

impl ShaderType for GlassShader {
    fn name(&self) -> &str {
        "GlassShader"
    }

    fn schema(&self) -> PropertySchema {
        PropertySchema::new(SPECS)
    }

    fn bind(&self, params: &PropertyStore) -> Arc<dyn SurfaceShader> {
        let ior = params.scalar_or("ior", 1.4);
        Arc::new(Glass {
            diffuse: params.vec3_or("diffuse", Color::ZERO),
            specular: params.vec3_or("specular", Color::ONE),
            ambient: params.vec3_or("ambient", Color::ZERO),
            filter_color: params.vec3_or("filter_color", Color::ONE),
            roughness: params.scalar_or("roughness", 0.05),
            ior: if ior > 0.0 { ior } else { 1.0 },
        })
    }
}

impl SurfaceShader for Glass {
    fn shade(&self, hit: &SurfaceHit, tracer: &dyn Tracer) -> Radiance {
        let n = hit.normal;
        let mut color = self.ambient
            + direct_lighting(hit, tracer, self.diffuse, self.specular, self.roughness);

        let eta = if hit.entering {
            1.0 / self.ior
        } else {
            self.ior
        };
        let mirror = reflect(hit.incident, n);

        match refract(hit.incident, n, eta) {
            Some(transmitted) => {
                let kr = fresnel_schlick(-hit.incident.dot(n), self.ior);
                if let Some(r) = tracer.trace_reflection(hit, mirror) {
                    color += r.color * self.specular * kr;
                }
                if let Some(t) = tracer.trace_refraction(hit, transmitted) {
                    color += t.color * self.filter_color * (1.0 - kr);
                }
            }
            None => {
                if let Some(r) = tracer.trace_reflection(hit, mirror) {
                    color += r.color * self.specular;
                }
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
    fn depth_zero_gives_only_direct_term() {
        let ty = GlassShader;
        let params = ty.schema().defaults();
        let tracer = StubTracer::new(0);
        let out = ty.evaluate(&params, &head_on_hit(), &tracer);

        let mut unlit = StubTracer::new(0);
        unlit.environment = Color::splat(100.0);
        let same = ty.evaluate(&params, &head_on_hit(), &unlit);

        assert_eq!(out, same);
        assert_eq!(tracer.refractions.get(), 0);
        assert_eq!(tracer.reflections.get(), 0);
    }

    #[test]
    fn refraction_tinted_by_filter_color() {
        let ty = GlassShader;
        let mut params = ty.schema().defaults();
        let schema = ty.schema();
        schema
            .apply(&mut params, "filter_color", PropertyValue::vec3(0.0, 0.0, 1.0))
            .unwrap();
        schema
            .apply(&mut params, "specular", PropertyValue::vec3(0.0, 0.0, 0.0))
            .unwrap();
        let mut tracer = StubTracer::new(1);
        tracer.lights.clear();
        tracer.environment = Color::ONE;
        let out = ty.evaluate(&params, &head_on_hit(), &tracer);
        assert_eq!(tracer.refractions.get(), 1);
        assert_eq!(out.color.x, 0.0);
        assert_eq!(out.color.y, 0.0);
        assert!(out.color.z > 0.9);
    }
}

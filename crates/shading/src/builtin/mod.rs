//! Shader plugins that ship with the engine.
//!
//! Each module exposes a registration entry point with the same shape an
//! external plugin would have; the built-in catalog maps the plugin name to it.

mod constant;
mod glass;
mod plastic;

pub use constant::ConstantShader;
pub use glass::GlassShader;
pub use plastic::PlasticShader;

use crate::plugin::{PluginCatalog, ShaderTypeRegistrar};
use crate::shader::{SurfaceHit, Tracer, reflect};
use glam::Vec3;
use raystage_common::Color;

/// Catalog holding every built-in plugin.
pub fn catalog() -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    catalog.insert("ConstantShader", register_constant);
    catalog.insert("PlasticShader", register_plastic);
    catalog.insert("GlassShader", register_glass);
    catalog
}

fn register_constant(registrar: &mut ShaderTypeRegistrar) -> Result<(), String> {
    registrar.register(ConstantShader);
    Ok(())
}

fn register_plastic(registrar: &mut ShaderTypeRegistrar) -> Result<(), String> {
    registrar.register(PlasticShader);
    Ok(())
}

fn register_glass(registrar: &mut ShaderTypeRegistrar) -> Result<(), String> {
    registrar.register(GlassShader);
    Ok(())
}

/// Lambert diffuse plus Phong highlight summed over all visible lights.
fn direct_lighting(
    hit: &SurfaceHit,
    tracer: &dyn Tracer,
    diffuse: Color,
    specular: Color,
    roughness: f32,
) -> Color {
    let n = hit.normal;
    let v = hit.view();
    let shininess = 1.0 / roughness.max(1e-3);
    let mut sum = Vec3::ZERO;
    for light in tracer.illuminate(hit.position, n) {
        let n_dot_l = n.dot(light.direction);
        if n_dot_l <= 0.0 {
            continue;
        }
        let r = reflect(-light.direction, n);
        let highlight = r.dot(v).max(0.0).powf(shininess);
        sum += light.radiance * (diffuse * n_dot_l + specular * highlight);
    }
    sum
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::shader::{LightSample, PathDepth, Radiance, SurfaceHit, Tracer};
    use glam::Vec3;
    use std::cell::Cell;

    /// Tracer stub: fixed lights, constant environment, a configurable depth bound.
    pub struct StubTracer {
        pub lights: Vec<LightSample>,
        pub environment: Vec3,
        pub max_depth: u32,
        pub reflections: Cell<u32>,
        pub refractions: Cell<u32>,
    }

    impl StubTracer {
        pub fn new(max_depth: u32) -> Self {
            Self {
                lights: vec![LightSample {
                    direction: Vec3::Y,
                    distance: 10.0,
                    radiance: Vec3::ONE,
                }],
                environment: Vec3::new(0.0, 0.0, 5.0),
                max_depth,
                reflections: Cell::new(0),
                refractions: Cell::new(0),
            }
        }
    }

    impl Tracer for StubTracer {
        fn illuminate(&self, _point: Vec3, _normal: Vec3) -> Vec<LightSample> {
            self.lights.clone()
        }

        fn trace_reflection(&self, hit: &SurfaceHit, _direction: Vec3) -> Option<Radiance> {
            (hit.depth.reflect < self.max_depth).then(|| {
                self.reflections.set(self.reflections.get() + 1);
                Radiance::opaque(self.environment)
            })
        }

        fn trace_refraction(&self, hit: &SurfaceHit, _direction: Vec3) -> Option<Radiance> {
            (hit.depth.refract < self.max_depth).then(|| {
                self.refractions.set(self.refractions.get() + 1);
                Radiance::opaque(self.environment)
            })
        }
    }

    /// Head-on hit of an upward-facing surface at the origin.
    pub fn head_on_hit() -> SurfaceHit {
        SurfaceHit {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            incident: Vec3::NEG_Y,
            distance: 1.0,
            entering: true,
            depth: PathDepth::default(),
            object: 0,
        }
    }
}

use glam::Vec3;
use raystage_common::{Color, PropertySchema, PropertyStore};
use std::fmt;
use std::sync::Arc;

/// Shaded result of one ray: color plus coverage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radiance {
    pub color: Color,
    pub alpha: f32,
}

impl Radiance {
    pub const ZERO: Self = Self {
        color: Vec3::ZERO,
        alpha: 0.0,
    };

    pub fn opaque(color: Color) -> Self {
        Self { color, alpha: 1.0 }
    }
}

/// Number of secondary bounces a path has taken so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathDepth {
    pub reflect: u32,
    pub refract: u32,
}

/// Everything a shader knows about the surface point it is shading.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    pub position: Vec3,
    /// Unit shading normal, flipped to face against `incident`.
    pub normal: Vec3,
    /// Unit direction of the ray that produced this hit.
    pub incident: Vec3,
    pub distance: f32,
    /// Whether the ray hit the front face of the surface (entering the medium).
    pub entering: bool,
    pub depth: PathDepth,
    /// Tracer-assigned index of the object that was hit. Shaders pass it
    /// back unchanged through the hit they hand to [`Tracer`].
    pub object: usize,
}

impl SurfaceHit {
    /// Direction towards the viewer.
    pub fn view(&self) -> Vec3 {
        -self.incident
    }
}

/// Light arriving at a surface point from one light source.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    /// Unit direction from the surface point towards the light.
    pub direction: Vec3,
    pub distance: f32,
    pub radiance: Color,
}

/// Services the renderer offers to shaders while they evaluate.
pub trait Tracer {
    /// Direct lighting at `point`. Occluded samples are dropped when shadows
    /// are enabled for the render.
    fn illuminate(&self, point: Vec3, normal: Vec3) -> Vec<LightSample>;

    /// Radiance along a reflected ray leaving `hit`, or `None` once the path
    /// has reached the reflection depth bound.
    fn trace_reflection(&self, hit: &SurfaceHit, direction: Vec3) -> Option<Radiance>;

    /// Radiance along a refracted ray leaving `hit`, or `None` once the path
    /// has reached the refraction depth bound.
    fn trace_refraction(&self, hit: &SurfaceHit, direction: Vec3) -> Option<Radiance>;
}

/// A shader type bound to the property values of one shader entity.
pub trait SurfaceShader: Send + Sync {
    fn shade(&self, hit: &SurfaceHit, tracer: &dyn Tracer) -> Radiance;
}

/// A shader implementation provided by a plugin.
///
/// Plugins register these through the plugin registry; shader entities are
/// instances of one type with their own property store.
pub trait ShaderType: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Properties a shader entity of this type accepts.
    fn schema(&self) -> PropertySchema;

    /// Resolve `params` once into a shader ready for evaluation.
    fn bind(&self, params: &PropertyStore) -> Arc<dyn SurfaceShader>;

    /// Shade one hit directly from a property store.
    fn evaluate(&self, params: &PropertyStore, hit: &SurfaceHit, tracer: &dyn Tracer) -> Radiance {
        self.bind(params).shade(hit, tracer)
    }
}

/// Mirror `incident` about `normal`.
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - normal * (2.0 * incident.dot(normal))
}

/// Refract `incident` through a surface with relative index `eta`
/// (outside / inside). Returns `None` on total internal reflection.
pub fn refract(incident: Vec3, normal: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = -incident.dot(normal);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    (k >= 0.0).then(|| (incident * eta + normal * (eta * cos_i - k.sqrt())).normalize())
}

/// Schlick's approximation of the Fresnel reflectance.
pub fn fresnel_schlick(cos_i: f32, ior: f32) -> f32 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cos_i.clamp(0.0, 1.0)).powi(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_flips_normal_component() {
        let r = reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::Y);
        assert_eq!(r, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn refract_straight_through_at_normal_incidence() {
        let t = refract(Vec3::NEG_Y, Vec3::Y, 1.0 / 1.5).unwrap();
        assert!((t - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn total_internal_reflection() {
        let grazing = Vec3::new(1.0, -0.1, 0.0).normalize();
        assert!(refract(grazing, Vec3::Y, 1.5).is_none());
    }

    #[test]
    fn fresnel_grows_towards_grazing() {
        assert!(fresnel_schlick(1.0, 1.5) < fresnel_schlick(0.1, 1.5));
        assert!((fresnel_schlick(0.0, 1.5) - 1.0).abs() < 1e-5);
    }
}

use crate::camera::Camera;
use crate::geometry::SceneGeometry;
use glam::{UVec2, Vec3};
use raystage_common::{Color, PropertyStore, Ray};
use raystage_kernel::{EntityData, EntityId, GroupHandle, Scene, kind};
use raystage_shading::{
    LightSample, PathDepth, Radiance, SurfaceHit, SurfaceShader, Tracer,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Offset applied to secondary and shadow rays to clear the surface they leave.
const RAY_EPSILON: f32 = 1e-4;

/// Appearance of instances without a shader: unlit 18% grey, opaque.
pub const DEFAULT_APPEARANCE: Radiance = Radiance {
    color: Vec3::splat(0.18),
    alpha: 1.0,
};

/// Renderer properties read when a render begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub resolution: UVec2,
    pub pixel_samples: UVec2,
    pub sample_jitter: f32,
    pub max_reflect_depth: u32,
    pub max_refract_depth: u32,
    pub cast_shadow: bool,
    pub background: Color,
}

impl RenderSettings {
    pub fn from_properties(props: &PropertyStore) -> Self {
        let pair = |key: &str, fallback: UVec2| {
            props
                .get(key)
                .map_or(fallback, |v| v.to_vec2().max(glam::Vec2::ONE).as_uvec2())
        };
        let count = |key: &str, fallback: f32| props.scalar_or(key, fallback).max(0.0) as u32;
        Self {
            resolution: pair("resolution", UVec2::new(320, 240)),
            pixel_samples: pair("pixelsamples", UVec2::new(3, 3)),
            sample_jitter: props.scalar_or("sample_jitter", 1.0).clamp(0.0, 1.0),
            max_reflect_depth: count("max_reflect_depth", 3.0),
            max_refract_depth: count("max_refract_depth", 3.0),
            cast_shadow: props.scalar_or("cast_shadow", 1.0) != 0.0,
            background: props.vec3_or("background", Color::ZERO),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.resolution.x as f32 / self.resolution.y as f32
    }
}

#[derive(Debug, Clone, Copy)]
struct PointLight {
    position: Vec3,
    radiance: Color,
}

/// Instances a placed instance's secondary rays may hit, as masks over
/// [`SceneGeometry::instances`]. `None` means every instance.
#[derive(Debug, Clone, Default)]
struct SecondaryTargets {
    reflect: Option<Arc<[bool]>>,
    refract: Option<Arc<[bool]>>,
}

/// Immutable snapshot of everything one render reads. Shared by all workers.
pub struct RenderScene {
    geometry: SceneGeometry,
    /// Bound shader per placed instance, `None` for the default appearance.
    shaders: Vec<Option<Arc<dyn SurfaceShader>>>,
    targets: Vec<SecondaryTargets>,
    lights: Vec<PointLight>,
    camera: Camera,
    settings: RenderSettings,
}

impl RenderScene {
    /// Bind shaders, lights and the camera against already built geometry.
    pub fn new(
        scene: &Scene,
        geometry: SceneGeometry,
        camera: &PropertyStore,
        settings: RenderSettings,
    ) -> Self {
        let shaders = geometry
            .instances()
            .iter()
            .map(|placed| {
                let EntityData::ObjectInstance {
                    shader: Some(shader),
                    ..
                } = scene.entity(placed.handle).data()
                else {
                    return None;
                };
                let entity = scene.entity(*shader);
                match entity.data() {
                    EntityData::Shader(shader_type) => Some(shader_type.bind(entity.properties())),
                    _ => None,
                }
            })
            .collect();
        let targets = secondary_targets(scene, &geometry);

        let lights = scene
            .entities_of::<kind::Light>()
            .map(|(_, light)| {
                let props = light.properties();
                PointLight {
                    position: props.vec3_or("position", Vec3::ZERO),
                    radiance: props.vec3_or("color", Color::ONE)
                        * props.scalar_or("intensity", 1.0),
                }
            })
            .collect();

        Self {
            geometry,
            shaders,
            targets,
            lights,
            camera: Camera::from_properties(camera, settings.aspect()),
            settings,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn geometry(&self) -> &SceneGeometry {
        &self.geometry
    }

    /// Radiance along `ray` and the distance to the first hit.
    /// Misses return the background with zero alpha.
    pub fn trace(&self, ray: &Ray, depth: PathDepth) -> (Radiance, Option<f32>) {
        self.trace_among(ray, depth, None)
    }

    fn trace_among(
        &self,
        ray: &Ray,
        depth: PathDepth,
        among: Option<&[bool]>,
    ) -> (Radiance, Option<f32>) {
        let Some(hit) = self.geometry.intersect_among(ray, among) else {
            return (
                Radiance {
                    color: self.settings.background,
                    alpha: 0.0,
                },
                None,
            );
        };
        let incident = ray.direction.normalize();
        let mut normal = hit.shading_normal;
        if normal.dot(incident) > 0.0 {
            normal = -normal;
        }
        let surface = SurfaceHit {
            position: hit.position,
            normal,
            incident,
            distance: hit.t,
            entering: hit.geometric_normal.dot(incident) < 0.0,
            depth,
            object: hit.instance,
        };
        let radiance = match &self.shaders[hit.instance] {
            Some(shader) => shader.shade(&surface, self),
            None => DEFAULT_APPEARANCE,
        };
        (radiance, Some(hit.t))
    }

    fn spawn(
        &self,
        hit: &SurfaceHit,
        direction: Vec3,
        depth: PathDepth,
        among: Option<&[bool]>,
    ) -> Radiance {
        let ray = Ray::with_range(hit.position, direction, RAY_EPSILON, f32::INFINITY);
        self.trace_among(&ray, depth, among).0
    }

    fn targets_of(&self, hit: &SurfaceHit) -> Option<&SecondaryTargets> {
        self.targets.get(hit.object)
    }
}

fn secondary_targets(scene: &Scene, geometry: &SceneGeometry) -> Vec<SecondaryTargets> {
    let mut masks: HashMap<EntityId, Arc<[bool]>> = HashMap::new();
    let mut mask_of = |group: Option<GroupHandle>| {
        let group = group?;
        let mask = masks.entry(group.id()).or_insert_with(|| {
            let members: HashSet<_> = scene.group_members(group).iter().copied().collect();
            geometry
                .instances()
                .iter()
                .map(|placed| members.contains(&placed.handle))
                .collect()
        });
        Some(Arc::clone(mask))
    };
    geometry
        .instances()
        .iter()
        .map(|placed| match scene.entity(placed.handle).data() {
            EntityData::ObjectInstance {
                reflect_target,
                refract_target,
                ..
            } => SecondaryTargets {
                reflect: mask_of(*reflect_target),
                refract: mask_of(*refract_target),
            },
            _ => SecondaryTargets::default(),
        })
        .collect()
}

impl Tracer for RenderScene {
    fn illuminate(&self, point: Vec3, _normal: Vec3) -> Vec<LightSample> {
        self.lights
            .iter()
            .filter_map(|light| {
                let to_light = light.position - point;
                let distance = to_light.length();
                if distance <= RAY_EPSILON {
                    return None;
                }
                let direction = to_light / distance;
                if self.settings.cast_shadow {
                    let shadow =
                        Ray::with_range(point, direction, RAY_EPSILON, distance - RAY_EPSILON);
                    if self.geometry.occluded(&shadow) {
                        return None;
                    }
                }
                Some(LightSample {
                    direction,
                    distance,
                    radiance: light.radiance,
                })
            })
            .collect()
    }

    fn trace_reflection(&self, hit: &SurfaceHit, direction: Vec3) -> Option<Radiance> {
        if hit.depth.reflect >= self.settings.max_reflect_depth {
            return None;
        }
        let depth = PathDepth {
            reflect: hit.depth.reflect + 1,
            ..hit.depth
        };
        let among = self.targets_of(hit).and_then(|t| t.reflect.as_deref());
        Some(self.spawn(hit, direction, depth, among))
    }

    fn trace_refraction(&self, hit: &SurfaceHit, direction: Vec3) -> Option<Radiance> {
        if hit.depth.refract >= self.settings.max_refract_depth {
            return None;
        }
        let depth = PathDepth {
            refract: hit.depth.refract + 1,
            ..hit.depth
        };
        let among = self.targets_of(hit).and_then(|t| t.refract.as_deref());
        Some(self.spawn(hit, direction, depth, among))
    }
}

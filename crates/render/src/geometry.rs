use crate::accel::{Bvh, MeshAccel};
use crate::error::RenderError;
use glam::{Mat3, Mat4, Vec3};
use raystage_assets::{MeshId, MeshSource, MeshStore};
use raystage_common::{Aabb, PropertyStore, Ray, RotateOrder, Transform, TransformOrder};
use raystage_kernel::{EntityData, InstanceHandle, Scene, kind};
use std::collections::HashMap;

/// One object instance placed in the world.
#[derive(Debug)]
pub struct PlacedInstance {
    pub handle: InstanceHandle,
    /// Index into the shared mesh accelerators.
    pub mesh: usize,
    pub to_world: Mat4,
    pub to_object: Mat4,
    normal_matrix: Mat3,
    pub bounds: Aabb,
}

/// A world-space hit against the scene.
#[derive(Debug, Clone, Copy)]
pub struct GeometryHit {
    /// Index of the hit instance in [`SceneGeometry::instances`].
    pub instance: usize,
    pub t: f32,
    pub position: Vec3,
    pub geometric_normal: Vec3,
    pub shading_normal: Vec3,
}

/// Acceleration structures for every instanced mesh, plus the scene-level
/// BVH over instance world bounds.
#[derive(Debug, Default)]
pub struct SceneGeometry {
    meshes: Vec<MeshAccel>,
    instances: Vec<PlacedInstance>,
    bvh: Bvh,
}

impl SceneGeometry {
    /// Load every mesh referenced by an object instance, once per distinct
    /// mesh, and place the instances.
    pub fn build(scene: &Scene, source: &dyn MeshSource) -> Result<Self, RenderError> {
        let mut store = MeshStore::new();
        let mut accel_of: HashMap<MeshId, usize> = HashMap::new();
        let mut geometry = Self::default();

        for (handle, entity) in scene.entities_of::<kind::ObjectInstance>() {
            let EntityData::ObjectInstance { mesh, .. } = entity.data() else {
                continue;
            };
            let mesh_entity = scene.entity(*mesh);
            let EntityData::Mesh { path } = mesh_entity.data() else {
                continue;
            };
            let id = store
                .load(source, path)
                .map_err(|err| RenderError::Geometry {
                    mesh: mesh_entity.name().to_string(),
                    source: err,
                })?;
            let mesh_index = match accel_of.get(&id) {
                Some(&index) => index,
                None => {
                    let Some(data) = store.get(id) else { continue };
                    geometry.meshes.push(MeshAccel::build(data.clone()));
                    accel_of.insert(id, geometry.meshes.len() - 1);
                    geometry.meshes.len() - 1
                }
            };

            let to_world = instance_transform(entity.properties()).matrix();
            let to_object = to_world.inverse();
            if to_world.determinant() == 0.0 || !to_object.is_finite() {
                tracing::warn!(instance = entity.name(), "singular transform, instance skipped");
                continue;
            }
            geometry.instances.push(PlacedInstance {
                handle,
                mesh: mesh_index,
                to_world,
                to_object,
                normal_matrix: Mat3::from_mat4(to_object).transpose(),
                bounds: geometry.meshes[mesh_index].bounds().transformed(&to_world),
            });
        }

        let bounds: Vec<Aabb> = geometry.instances.iter().map(|i| i.bounds).collect();
        geometry.bvh = Bvh::build(&bounds);
        tracing::debug!(
            meshes = geometry.meshes.len(),
            instances = geometry.instances.len(),
            "acceleration built"
        );
        Ok(geometry)
    }

    pub fn instances(&self) -> &[PlacedInstance] {
        &self.instances
    }

    /// Number of distinct mesh accelerators.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn bounds(&self) -> Aabb {
        self.bvh.bounds()
    }

    pub fn intersect(&self, ray: &Ray) -> Option<GeometryHit> {
        self.intersect_among(ray, None)
    }

    /// Closest hit, considering only the instances flagged in `among` when
    /// given. `among` is indexed like [`SceneGeometry::instances`].
    pub fn intersect_among(&self, ray: &Ray, among: Option<&[bool]>) -> Option<GeometryHit> {
        let mut best = None;
        self.bvh.closest(ray, |i, ray| {
            if among.is_some_and(|mask| !mask.get(i).copied().unwrap_or(false)) {
                return None;
            }
            let instance = &self.instances[i];
            let local = ray.transformed(&instance.to_object);
            let hit = self.meshes[instance.mesh].intersect(&local)?;
            best = Some((i, hit));
            Some(hit.t)
        });
        let (i, hit) = best?;
        let instance = &self.instances[i];
        let (geometric, shading) = self.meshes[instance.mesh].normals(&hit);
        Some(GeometryHit {
            instance: i,
            t: hit.t,
            position: ray.at(hit.t),
            geometric_normal: (instance.normal_matrix * geometric).normalize_or_zero(),
            shading_normal: (instance.normal_matrix * shading).normalize_or_zero(),
        })
    }

    /// Whether anything lies along `ray` within its range.
    pub fn occluded(&self, ray: &Ray) -> bool {
        self.bvh.any(ray, |i, ray| {
            let instance = &self.instances[i];
            self.meshes[instance.mesh].occludes(&ray.transformed(&instance.to_object))
        })
    }
}

fn instance_transform(props: &PropertyStore) -> Transform {
    let choice = |key: &str| props.scalar_or(key, 0.0).max(0.0) as usize;
    Transform {
        translate: props.vec3_or("translate", Vec3::ZERO),
        rotate: props.vec3_or("rotate", Vec3::ZERO),
        scale: props.vec3_or("scale", Vec3::ONE),
        transform_order: TransformOrder::from_index(choice("transform_order")).unwrap_or_default(),
        rotate_order: RotateOrder::from_index(choice("rotate_order")).unwrap_or_default(),
    }
}

use crate::entity::{
    CameraHandle, Entity, EntityData, EntityId, EntityKind, FrameBufferHandle, GroupHandle,
    Handle, InstanceHandle, KindTag, LightHandle, MeshHandle, RendererHandle, ShaderHandle,
};
use crate::framebuffer::{ChannelLayout, FrameBuffer};
use crate::schema;
use raystage_common::{PropertyError, PropertySchema, PropertyValue};
use raystage_shading::{PluginError, PluginRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Errors from scene registry and binding operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("an entity named '{0}' already exists")]
    NameConflict(String),
    #[error("no entity named '{0}'")]
    UnknownEntity(String),
    #[error("'{name}' is a {actual}, expected a {expected}")]
    KindMismatch {
        name: String,
        expected: EntityKind,
        actual: EntityKind,
    },
    #[error("unknown {kind} type '{type_name}'")]
    UnknownType { kind: EntityKind, type_name: String },
    #[error("'{entity}' has no property '{key}'")]
    UnknownProperty { entity: String, key: String },
    #[error("property '{key}' of '{entity}' expects {expected} value(s), got {actual}")]
    ArityMismatch {
        entity: String,
        key: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid value for property '{key}' of '{entity}': {reason}")]
    InvalidPropertyValue {
        entity: String,
        key: String,
        reason: &'static str,
    },
    #[error("invalid channel layout '{layout}': {reason}")]
    InvalidChannelLayout { layout: String, reason: &'static str },
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// The outgoing relations an entity can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    /// Object instance → shader.
    Shader,
    /// Renderer → camera.
    Camera,
    /// Renderer → frame buffer.
    FrameBuffer,
    /// Object instance → group its reflected rays may hit.
    ReflectTarget,
    /// Object instance → group its refracted rays may hit.
    RefractTarget,
}

/// An event record produced by every mutation to the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    Created {
        id: EntityId,
        kind: EntityKind,
        name: String,
    },
    PropertySet {
        id: EntityId,
        key: String,
        value: PropertyValue,
    },
    /// A relation was bound. `replaced` holds the previous target, if any.
    Bound {
        source: EntityId,
        relation: Relation,
        target: EntityId,
        replaced: Option<EntityId>,
    },
    /// An object instance joined a group.
    GroupMemberAdded {
        group: EntityId,
        instance: EntityId,
    },
    FrameCommitted {
        id: EntityId,
        width: u32,
        height: u32,
    },
}

/// Registry of every entity in one scene.
///
/// Entities live in an arena indexed by [`EntityId`]; names are resolved
/// once through the name table and typed handles are used from then on.
/// Entities are never removed.
#[derive(Debug, Default)]
pub struct Scene {
    entities: Vec<Entity>,
    names: HashMap<String, EntityId>,
    /// Append-only event log of all mutations.
    event_log: Vec<SceneEvent>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities in the scene.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    /// Entities of kind `K`, in creation order.
    pub fn entities_of<K: KindTag>(&self) -> impl Iterator<Item = (Handle<K>, &Entity)> {
        self.entities()
            .filter(|(_, e)| e.kind() == K::KIND)
            .map(|(id, e)| (Handle::new(id), e))
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// Entity behind a typed handle.
    ///
    /// Handles are only minted by this scene and entities are never removed,
    /// so the lookup always succeeds for handles obtained from it.
    pub fn entity<K>(&self, handle: Handle<K>) -> &Entity {
        &self.entities[handle.id().index()]
    }

    pub fn id_of(&self, name: &str) -> Result<EntityId, SceneError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::UnknownEntity(name.to_string()))
    }

    /// Look up an entity by name.
    pub fn resolve(&self, name: &str) -> Result<&Entity, SceneError> {
        let id = self.id_of(name)?;
        Ok(&self.entities[id.index()])
    }

    /// Look up an entity by name and check it has kind `K`.
    pub fn resolve_as<K: KindTag>(&self, name: &str) -> Result<Handle<K>, SceneError> {
        let id = self.id_of(name)?;
        self.check_kind::<K>(id)
    }

    pub(crate) fn check_kind<K: KindTag>(&self, id: EntityId) -> Result<Handle<K>, SceneError> {
        let entity = &self.entities[id.index()];
        if entity.kind() != K::KIND {
            return Err(SceneError::KindMismatch {
                name: entity.name.clone(),
                expected: K::KIND,
                actual: entity.kind(),
            });
        }
        Ok(Handle::new(id))
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.index()]
    }

    pub(crate) fn record(&mut self, event: SceneEvent) {
        self.event_log.push(event);
    }

    /// Create an entity of any kind from its type string.
    ///
    /// The type string means what the command surface passes: the camera,
    /// light or shader type, the mesh path, the instance's mesh name, the
    /// channel layout. Object groups and renderers ignore it.
    pub fn create(
        &mut self,
        plugins: &PluginRegistry,
        name: &str,
        kind: EntityKind,
        type_name: &str,
    ) -> Result<EntityId, SceneError> {
        Ok(match kind {
            EntityKind::Camera => self.create_camera(name, type_name)?.id(),
            EntityKind::Light => self.create_light(name, type_name)?.id(),
            EntityKind::Shader => self.create_shader(plugins, name, type_name)?.id(),
            EntityKind::Mesh => self.create_mesh(name, type_name)?.id(),
            EntityKind::ObjectInstance => self.create_instance(name, type_name)?.id(),
            EntityKind::ObjectGroup => self.create_object_group(name)?.id(),
            EntityKind::FrameBuffer => self.create_framebuffer(name, type_name)?.id(),
            EntityKind::Renderer => self.create_renderer(name)?.id(),
        })
    }

    pub fn create_camera(&mut self, name: &str, type_name: &str) -> Result<CameraHandle, SceneError> {
        let schema = schema::camera_schema(type_name).ok_or_else(|| SceneError::UnknownType {
            kind: EntityKind::Camera,
            type_name: type_name.to_string(),
        })?;
        self.insert(name, type_name, schema, EntityData::Camera)
            .map(Handle::new)
    }

    pub fn create_light(&mut self, name: &str, type_name: &str) -> Result<LightHandle, SceneError> {
        let schema = schema::light_schema(type_name).ok_or_else(|| SceneError::UnknownType {
            kind: EntityKind::Light,
            type_name: type_name.to_string(),
        })?;
        self.insert(name, type_name, schema, EntityData::Light)
            .map(Handle::new)
    }

    /// Create a shader entity. The type must already be registered by an
    /// opened plugin.
    pub fn create_shader(
        &mut self,
        plugins: &PluginRegistry,
        name: &str,
        type_name: &str,
    ) -> Result<ShaderHandle, SceneError> {
        self.ensure_free(name)?;
        let shader_type = plugins.resolve_type(type_name)?;
        let schema = shader_type.schema();
        self.insert(name, type_name, schema, EntityData::Shader(shader_type))
            .map(Handle::new)
    }

    /// Create a mesh entity backed by the geometry at `path`. The geometry is
    /// only loaded when a render needs it.
    pub fn create_mesh(&mut self, name: &str, path: &str) -> Result<MeshHandle, SceneError> {
        let data = EntityData::Mesh {
            path: PathBuf::from(path),
        };
        self.insert(name, path, PropertySchema::EMPTY, data)
            .map(Handle::new)
    }

    /// Create an object instance of the mesh named `mesh`.
    pub fn create_instance(&mut self, name: &str, mesh: &str) -> Result<InstanceHandle, SceneError> {
        self.ensure_free(name)?;
        let mesh_handle = self.resolve_as(mesh)?;
        let data = EntityData::ObjectInstance {
            mesh: mesh_handle,
            shader: None,
            reflect_target: None,
            refract_target: None,
        };
        self.insert(name, mesh, schema::INSTANCE_SCHEMA, data)
            .map(Handle::new)
    }

    /// Create an empty object group.
    pub fn create_object_group(&mut self, name: &str) -> Result<GroupHandle, SceneError> {
        let data = EntityData::ObjectGroup {
            members: Vec::new(),
        };
        self.insert(name, "", PropertySchema::EMPTY, data)
            .map(Handle::new)
    }

    pub fn create_framebuffer(
        &mut self,
        name: &str,
        layout: &str,
    ) -> Result<FrameBufferHandle, SceneError> {
        let channels =
            ChannelLayout::parse(layout).map_err(|reason| SceneError::InvalidChannelLayout {
                layout: layout.to_string(),
                reason,
            })?;
        let data = EntityData::FrameBuffer(FrameBuffer::new(channels));
        self.insert(name, layout, PropertySchema::EMPTY, data)
            .map(Handle::new)
    }

    pub fn create_renderer(&mut self, name: &str) -> Result<RendererHandle, SceneError> {
        let data = EntityData::Renderer {
            camera: None,
            framebuffer: None,
        };
        self.insert(name, schema::RENDERER, schema::RENDERER_SCHEMA, data)
            .map(Handle::new)
    }

    fn ensure_free(&self, name: &str) -> Result<(), SceneError> {
        if self.names.contains_key(name) {
            return Err(SceneError::NameConflict(name.to_string()));
        }
        Ok(())
    }

    fn insert(
        &mut self,
        name: &str,
        type_name: &str,
        schema: PropertySchema,
        data: EntityData,
    ) -> Result<EntityId, SceneError> {
        self.ensure_free(name)?;
        let id = EntityId(self.entities.len() as u32);
        let kind = data.kind();
        self.entities.push(Entity {
            name: name.to_string(),
            type_name: type_name.to_string(),
            properties: schema.defaults(),
            schema,
            data,
        });
        self.names.insert(name.to_string(), id);
        tracing::debug!(name, %kind, type_name, "entity created");
        self.record(SceneEvent::Created {
            id,
            kind,
            name: name.to_string(),
        });
        Ok(id)
    }

    /// Validate `value` against the entity's schema and store it. Last write wins.
    pub fn set_property(
        &mut self,
        name: &str,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), SceneError> {
        let id = self.id_of(name)?;
        let entity = self.entity_mut(id);
        let schema = entity.schema;
        schema
            .apply(&mut entity.properties, key, value)
            .map_err(|e| property_error(name, &schema, key, e))?;
        tracing::debug!(entity = name, key, %value, "property set");
        self.record(SceneEvent::PropertySet {
            id,
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    /// Slice form of [`Scene::set_property`] for 1 to 3 values.
    pub fn set_property_values(
        &mut self,
        name: &str,
        key: &str,
        values: &[f32],
    ) -> Result<(), SceneError> {
        let id = self.id_of(name)?;
        let schema = self.entities[id.index()].schema;
        let value = PropertyValue::from_slice(values)
            .map_err(|e| property_error(name, &schema, key, e))?;
        self.set_property(name, key, value)
    }

    pub fn framebuffer(&self, handle: FrameBufferHandle) -> Option<&FrameBuffer> {
        match &self.entity(handle).data {
            EntityData::FrameBuffer(fb) => Some(fb),
            _ => None,
        }
    }

    /// Members of an object group, in the order they were added.
    pub fn group_members(&self, handle: GroupHandle) -> &[InstanceHandle] {
        match &self.entity(handle).data {
            EntityData::ObjectGroup { members } => members,
            _ => &[],
        }
    }

    /// Replace the contents of a frame buffer with a finished render.
    pub fn commit_frame(&mut self, handle: FrameBufferHandle, frame: FrameBuffer) {
        let (width, height) = (frame.width(), frame.height());
        let entity = self.entity_mut(handle.id());
        entity.data = EntityData::FrameBuffer(frame);
        self.record(SceneEvent::FrameCommitted {
            id: handle.id(),
            width,
            height,
        });
    }
}

fn property_error(entity: &str, schema: &PropertySchema, key: &str, err: PropertyError) -> SceneError {
    match err {
        PropertyError::UnknownProperty { key } => SceneError::UnknownProperty {
            entity: entity.to_string(),
            key,
        },
        PropertyError::ArityMismatch {
            key,
            expected,
            actual,
        } => SceneError::ArityMismatch {
            entity: entity.to_string(),
            key,
            expected,
            actual,
        },
        PropertyError::InvalidValue { key, reason } => SceneError::InvalidPropertyValue {
            entity: entity.to_string(),
            key,
            reason,
        },
        PropertyError::InvalidArity(actual) => match schema.spec(key) {
            Some(spec) => SceneError::ArityMismatch {
                entity: entity.to_string(),
                key: key.to_string(),
                expected: spec.arity(),
                actual,
            },
            None => SceneError::UnknownProperty {
                entity: entity.to_string(),
                key: key.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::kind;

    fn plugins() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.open("PlasticShader").unwrap();
        registry
    }

    #[test]
    fn scene_starts_empty() {
        let scene = Scene::new();
        assert_eq!(scene.entity_count(), 0);
        assert!(scene.events().is_empty());
    }

    #[test]
    fn duplicate_name_conflicts_across_kinds() {
        let plugins = plugins();
        for first in EntityKind::ALL {
            for second in EntityKind::ALL {
                let mut scene = Scene::new();
                scene.create_mesh("geo", "geo.mesh").unwrap();
                scene.create_framebuffer("fb", "rgba").unwrap();
                let type_for = |kind: EntityKind| match kind {
                    EntityKind::Camera => schema::PERSPECTIVE_CAMERA,
                    EntityKind::Light => schema::POINT_LIGHT,
                    EntityKind::Shader => "PlasticShader",
                    EntityKind::Mesh => "a.mesh",
                    EntityKind::ObjectInstance => "geo",
                    EntityKind::ObjectGroup => "",
                    EntityKind::FrameBuffer => "rgb",
                    EntityKind::Renderer => "",
                };
                scene
                    .create(&plugins, "n", first, type_for(first))
                    .unwrap();
                let err = scene
                    .create(&plugins, "n", second, type_for(second))
                    .unwrap_err();
                assert_eq!(err, SceneError::NameConflict("n".into()));
            }
        }
    }

    #[test]
    fn shader_requires_opened_plugin() {
        let mut registry = PluginRegistry::new();
        let mut scene = Scene::new();
        let err = scene
            .create_shader(&registry, "glass", "GlassShader")
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::Plugin(PluginError::ShaderTypeNotFound("GlassShader".into()))
        );
        assert!(scene.resolve("glass").is_err());

        registry.open("GlassShader").unwrap();
        let handle = scene.create_shader(&registry, "glass", "GlassShader").unwrap();
        assert_eq!(scene.entity(handle).type_name(), "GlassShader");
    }

    #[test]
    fn unknown_camera_type() {
        let mut scene = Scene::new();
        let err = scene.create_camera("cam", "OrthoCamera").unwrap_err();
        assert!(matches!(err, SceneError::UnknownType { .. }));
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn instance_needs_a_mesh() {
        let mut scene = Scene::new();
        scene.create_renderer("ren").unwrap();
        assert_eq!(
            scene.create_instance("obj", "nothing").unwrap_err(),
            SceneError::UnknownEntity("nothing".into())
        );
        assert!(matches!(
            scene.create_instance("obj", "ren").unwrap_err(),
            SceneError::KindMismatch {
                expected: EntityKind::Mesh,
                actual: EntityKind::Renderer,
                ..
            }
        ));
        let mesh = scene.create_mesh("m", "m.mesh").unwrap();
        let obj = scene.create_instance("obj", "m").unwrap();
        match scene.entity(obj).data() {
            EntityData::ObjectInstance {
                mesh: m,
                shader,
                reflect_target,
                refract_target,
            } => {
                assert_eq!(*m, mesh);
                assert!(shader.is_none());
                assert!(reflect_target.is_none() && refract_target.is_none());
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn bad_channel_layout() {
        let mut scene = Scene::new();
        assert!(matches!(
            scene.create_framebuffer("fb", "rgbq"),
            Err(SceneError::InvalidChannelLayout { .. })
        ));
    }

    #[test]
    fn set_property_errors() {
        let mut scene = Scene::new();
        scene.create_renderer("ren").unwrap();

        assert_eq!(
            scene
                .set_property("nobody", "resolution", PropertyValue::vec2(2.0, 2.0))
                .unwrap_err(),
            SceneError::UnknownEntity("nobody".into())
        );
        assert!(matches!(
            scene
                .set_property("ren", "exposure", PropertyValue::scalar(1.0))
                .unwrap_err(),
            SceneError::UnknownProperty { .. }
        ));
        assert_eq!(
            scene
                .set_property("ren", "resolution", PropertyValue::scalar(2.0))
                .unwrap_err(),
            SceneError::ArityMismatch {
                entity: "ren".into(),
                key: "resolution".into(),
                expected: 2,
                actual: 1,
            }
        );
        assert!(matches!(
            scene
                .set_property("ren", "max_refract_depth", PropertyValue::scalar(-1.0))
                .unwrap_err(),
            SceneError::InvalidPropertyValue { .. }
        ));
        assert!(matches!(
            scene
                .set_property_values("ren", "resolution", &[1.0, 2.0, 3.0, 4.0])
                .unwrap_err(),
            SceneError::ArityMismatch { actual: 4, .. }
        ));
    }

    #[test]
    fn set_property_last_write_wins() {
        let mut scene = Scene::new();
        let ren = scene.create_renderer("ren").unwrap();
        scene
            .set_property("ren", "resolution", PropertyValue::vec2(640.0, 480.0))
            .unwrap();
        scene
            .set_property_values("ren", "resolution", &[160.0, 120.0])
            .unwrap();
        assert_eq!(
            scene.entity(ren).properties().get("resolution"),
            Some(&PropertyValue::vec2(160.0, 120.0))
        );
    }

    #[test]
    fn resolve_as_checks_kind() {
        let mut scene = Scene::new();
        let cam = scene
            .create_camera("cam", schema::PERSPECTIVE_CAMERA)
            .unwrap();
        assert_eq!(scene.resolve_as::<kind::Camera>("cam").unwrap(), cam);
        assert!(matches!(
            scene.resolve_as::<kind::Light>("cam"),
            Err(SceneError::KindMismatch { .. })
        ));
    }

    #[test]
    fn events_are_recorded() {
        let mut scene = Scene::new();
        scene.create_renderer("ren").unwrap();
        scene
            .set_property("ren", "cast_shadow", PropertyValue::scalar(0.0))
            .unwrap();
        assert_eq!(scene.events().len(), 2);
        assert!(scene.set_property("ren", "bogus", PropertyValue::scalar(0.0)).is_err());
        assert_eq!(scene.drain_events().len(), 2);
        assert!(scene.events().is_empty());
    }

    #[test]
    fn commit_frame_replaces_contents() {
        let mut scene = Scene::new();
        let fb = scene.create_framebuffer("fb", "rgba").unwrap();
        assert!(!scene.framebuffer(fb).unwrap().is_rendered());
        let layout = ChannelLayout::parse("rgba").unwrap();
        let frame = FrameBuffer::from_parts(layout, 2, 2, vec![0.5; 16]).unwrap();
        scene.commit_frame(fb, frame);
        let stored = scene.framebuffer(fb).unwrap();
        assert_eq!((stored.width(), stored.height()), (2, 2));
    }
}

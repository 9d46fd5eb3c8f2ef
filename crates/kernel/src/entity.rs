use crate::framebuffer::FrameBuffer;
use raystage_common::{PropertySchema, PropertyStore};
use raystage_shading::ShaderType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

/// Index of an entity in the scene arena. Stable for the scene's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of an entity. Names share one namespace across all kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Camera,
    Light,
    Shader,
    Mesh,
    ObjectInstance,
    ObjectGroup,
    FrameBuffer,
    Renderer,
}

impl EntityKind {
    pub const ALL: [Self; 8] = [
        Self::Camera,
        Self::Light,
        Self::Shader,
        Self::Mesh,
        Self::ObjectInstance,
        Self::ObjectGroup,
        Self::FrameBuffer,
        Self::Renderer,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Camera => "camera",
            Self::Light => "light",
            Self::Shader => "shader",
            Self::Mesh => "mesh",
            Self::ObjectInstance => "object instance",
            Self::ObjectGroup => "object group",
            Self::FrameBuffer => "frame buffer",
            Self::Renderer => "renderer",
        };
        f.write_str(s)
    }
}

/// Compile-time tag for typed handles.
pub trait KindTag {
    const KIND: EntityKind;
}

/// Marker types for [`Handle`].
pub mod kind {
    use super::{EntityKind, KindTag};

    macro_rules! kind_tags {
        ($($name:ident),*) => {$(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name;

            impl KindTag for $name {
                const KIND: EntityKind = EntityKind::$name;
            }
        )*};
    }

    kind_tags!(
        Camera,
        Light,
        Shader,
        Mesh,
        ObjectInstance,
        ObjectGroup,
        FrameBuffer,
        Renderer
    );
}

/// An entity id statically known to refer to an entity of kind `K`.
pub struct Handle<K> {
    id: EntityId,
    _kind: PhantomData<K>,
}

impl<K> Handle<K> {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            _kind: PhantomData,
        }
    }

    pub fn id(self) -> EntityId {
        self.id
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K: KindTag> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", K::KIND, self.id.0)
    }
}

pub type CameraHandle = Handle<kind::Camera>;
pub type LightHandle = Handle<kind::Light>;
pub type ShaderHandle = Handle<kind::Shader>;
pub type MeshHandle = Handle<kind::Mesh>;
pub type InstanceHandle = Handle<kind::ObjectInstance>;
pub type GroupHandle = Handle<kind::ObjectGroup>;
pub type FrameBufferHandle = Handle<kind::FrameBuffer>;
pub type RendererHandle = Handle<kind::Renderer>;

/// Kind-specific state of an entity, including its outgoing bindings.
#[derive(Debug, Clone)]
pub enum EntityData {
    Camera,
    Light,
    Shader(Arc<dyn ShaderType>),
    Mesh {
        path: PathBuf,
    },
    ObjectInstance {
        mesh: MeshHandle,
        shader: Option<ShaderHandle>,
        /// Instances reflected rays leaving this one may hit; all when unset.
        reflect_target: Option<GroupHandle>,
        /// Instances refracted rays leaving this one may hit; all when unset.
        refract_target: Option<GroupHandle>,
    },
    /// Named set of object instances, in insertion order without repeats.
    ObjectGroup {
        members: Vec<InstanceHandle>,
    },
    FrameBuffer(FrameBuffer),
    Renderer {
        camera: Option<CameraHandle>,
        framebuffer: Option<FrameBufferHandle>,
    },
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Camera => EntityKind::Camera,
            Self::Light => EntityKind::Light,
            Self::Shader(_) => EntityKind::Shader,
            Self::Mesh { .. } => EntityKind::Mesh,
            Self::ObjectInstance { .. } => EntityKind::ObjectInstance,
            Self::ObjectGroup { .. } => EntityKind::ObjectGroup,
            Self::FrameBuffer(_) => EntityKind::FrameBuffer,
            Self::Renderer { .. } => EntityKind::Renderer,
        }
    }
}

/// A named, typed object in the scene.
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) schema: PropertySchema,
    pub(crate) properties: PropertyStore,
    pub(crate) data: EntityData,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    /// Type name: the camera/light/shader type, the mesh path, the frame
    /// buffer channel layout, or the mesh an instance was created from.
    /// Empty for object groups.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn data(&self) -> &EntityData {
        &self.data
    }
}

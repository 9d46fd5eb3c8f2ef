//! Scene kernel: the entity registry, typed handles, property schemas of the
//! engine's own entity types, relations between entities, object groups and
//! frame buffers.
//!
//! # Invariants
//! - Entity names are unique across all kinds.
//! - Every mutation flows through explicit operations and is recorded in the event log.
//! - A property value is only stored after it validated against the entity's schema.

pub mod binding;
pub mod entity;
pub mod framebuffer;
pub mod schema;
pub mod scene;

pub use entity::{
    CameraHandle, Entity, EntityData, EntityId, EntityKind, FrameBufferHandle, GroupHandle,
    Handle, InstanceHandle, KindTag, LightHandle, MeshHandle, RendererHandle, ShaderHandle, kind,
};
pub use framebuffer::{Channel, ChannelLayout, FrameBuffer, FrameBufferError};
pub use scene::{Relation, Scene, SceneError, SceneEvent};

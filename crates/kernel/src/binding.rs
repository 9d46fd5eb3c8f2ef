//! Relations between entities.
//!
//! Assigning a relation that is already bound replaces the previous target.
//! The replacement is logged and recorded in the scene event log. Group
//! membership is additive: adding an instance twice keeps one entry.

use crate::entity::{EntityData, EntityId, GroupHandle, InstanceHandle, kind};
use crate::scene::{Relation, Scene, SceneError, SceneEvent};

impl Scene {
    /// Bind the shader named `shader` to the object instance named `instance`.
    /// Returns the previously bound shader, if any.
    pub fn assign_shader(
        &mut self,
        instance: &str,
        shader: &str,
    ) -> Result<Option<EntityId>, SceneError> {
        let source = self.resolve_as::<kind::ObjectInstance>(instance)?;
        let target = self.resolve_as::<kind::Shader>(shader)?;
        let replaced = match &mut self.entity_mut(source.id()).data {
            EntityData::ObjectInstance { shader, .. } => shader.replace(target),
            _ => None,
        };
        Ok(self.bound(source.id(), Relation::Shader, target.id(), replaced.map(|h| h.id())))
    }

    /// Bind the camera named `camera` to the renderer named `renderer`.
    pub fn assign_camera(
        &mut self,
        renderer: &str,
        camera: &str,
    ) -> Result<Option<EntityId>, SceneError> {
        let source = self.resolve_as::<kind::Renderer>(renderer)?;
        let target = self.resolve_as::<kind::Camera>(camera)?;
        let replaced = match &mut self.entity_mut(source.id()).data {
            EntityData::Renderer { camera, .. } => camera.replace(target),
            _ => None,
        };
        Ok(self.bound(source.id(), Relation::Camera, target.id(), replaced.map(|h| h.id())))
    }

    /// Bind the frame buffer named `framebuffer` as the output of `renderer`.
    pub fn assign_framebuffer(
        &mut self,
        renderer: &str,
        framebuffer: &str,
    ) -> Result<Option<EntityId>, SceneError> {
        let source = self.resolve_as::<kind::Renderer>(renderer)?;
        let target = self.resolve_as::<kind::FrameBuffer>(framebuffer)?;
        let replaced = match &mut self.entity_mut(source.id()).data {
            EntityData::Renderer { framebuffer, .. } => framebuffer.replace(target),
            _ => None,
        };
        Ok(self.bound(
            source.id(),
            Relation::FrameBuffer,
            target.id(),
            replaced.map(|h| h.id()),
        ))
    }

    /// Add the object instance named `instance` to the group named `group`.
    /// Returns `false` when it was already a member.
    pub fn add_to_group(&mut self, group: &str, instance: &str) -> Result<bool, SceneError> {
        let target = self.resolve_as::<kind::ObjectGroup>(group)?;
        let member = self.resolve_as::<kind::ObjectInstance>(instance)?;
        let EntityData::ObjectGroup { members } = &mut self.entity_mut(target.id()).data else {
            return Ok(false);
        };
        if members.contains(&member) {
            return Ok(false);
        }
        members.push(member);
        tracing::debug!(group, instance, "group member added");
        self.record(SceneEvent::GroupMemberAdded {
            group: target.id(),
            instance: member.id(),
        });
        Ok(true)
    }

    /// Restrict reflected rays leaving `instance` to members of `group`.
    pub fn assign_reflect_target(
        &mut self,
        instance: &str,
        group: &str,
    ) -> Result<Option<EntityId>, SceneError> {
        self.assign_target(instance, group, Relation::ReflectTarget)
    }

    /// Restrict refracted rays leaving `instance` to members of `group`.
    pub fn assign_refract_target(
        &mut self,
        instance: &str,
        group: &str,
    ) -> Result<Option<EntityId>, SceneError> {
        self.assign_target(instance, group, Relation::RefractTarget)
    }

    fn assign_target(
        &mut self,
        instance: &str,
        group: &str,
        relation: Relation,
    ) -> Result<Option<EntityId>, SceneError> {
        let source: InstanceHandle = self.resolve_as(instance)?;
        let target: GroupHandle = self.resolve_as(group)?;
        let replaced = match &mut self.entity_mut(source.id()).data {
            EntityData::ObjectInstance {
                reflect_target,
                refract_target,
                ..
            } => match relation {
                Relation::RefractTarget => refract_target.replace(target),
                _ => reflect_target.replace(target),
            },
            _ => None,
        };
        Ok(self.bound(source.id(), relation, target.id(), replaced.map(|h| h.id())))
    }

    fn bound(
        &mut self,
        source: EntityId,
        relation: Relation,
        target: EntityId,
        replaced: Option<EntityId>,
    ) -> Option<EntityId> {
        if let Some(previous) = replaced.filter(|&p| p != target) {
            tracing::debug!(
                source = self.entity_name(source),
                ?relation,
                previous = self.entity_name(previous),
                target = self.entity_name(target),
                "binding replaced"
            );
        }
        self.record(SceneEvent::Bound {
            source,
            relation,
            target,
            replaced,
        });
        replaced
    }

    fn entity_name(&self, id: EntityId) -> &str {
        self.get(id).map(|e| e.name()).unwrap_or("?")
    }
}

use raystage_common::PropertyValue;
use raystage_kernel::{EntityData, EntityKind, Scene, SceneError};
use std::fmt;

/// Scene inspector for developer tooling.
///
/// Read-only queries against a scene for debugging and the CLI.
pub struct SceneInspector;

impl SceneInspector {
    /// Produce a summary of the scene.
    pub fn summary(scene: &Scene) -> SceneSummary {
        let counts = EntityKind::ALL
            .iter()
            .map(|&kind| {
                let n = scene.entities().filter(|(_, e)| e.kind() == kind).count();
                (kind, n)
            })
            .collect();
        let rendered_framebuffers = scene
            .entities()
            .filter(|(_, e)| matches!(e.data(), EntityData::FrameBuffer(fb) if fb.is_rendered()))
            .count();
        SceneSummary {
            entity_count: scene.entity_count(),
            counts,
            rendered_framebuffers,
            pending_events: scene.events().len(),
        }
    }

    /// Describe the entity named `name`: its kind, type, properties and bindings.
    pub fn describe(scene: &Scene, name: &str) -> Result<EntityInfo, SceneError> {
        let entity = scene.resolve(name)?;
        let target = |id| scene.get(id).map(|e| e.name().to_string());
        let mut bindings = Vec::new();
        let mut dimensions = None;
        match entity.data() {
            EntityData::ObjectInstance {
                mesh,
                shader,
                reflect_target,
                refract_target,
            } => {
                bindings.push(("mesh", Some(scene.entity(*mesh).name().to_string())));
                bindings.push(("shader", shader.and_then(|s| target(s.id()))));
                bindings.push(("reflect_target", reflect_target.and_then(|g| target(g.id()))));
                bindings.push(("refract_target", refract_target.and_then(|g| target(g.id()))));
            }
            EntityData::ObjectGroup { members } => {
                bindings.extend(members.iter().map(|m| ("member", target(m.id()))));
            }
            EntityData::Renderer {
                camera,
                framebuffer,
            } => {
                bindings.push(("camera", camera.and_then(|c| target(c.id()))));
                bindings.push(("framebuffer", framebuffer.and_then(|f| target(f.id()))));
            }
            EntityData::FrameBuffer(fb) => {
                dimensions = fb.is_rendered().then(|| (fb.width(), fb.height()));
            }
            _ => {}
        }
        Ok(EntityInfo {
            name: entity.name().to_string(),
            kind: entity.kind(),
            type_name: entity.type_name().to_string(),
            properties: entity
                .properties()
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            bindings,
            dimensions,
        })
    }
}

/// Summary of scene state for the inspector.
#[derive(Debug, Clone)]
pub struct SceneSummary {
    pub entity_count: usize,
    /// Entity count per kind, in [`EntityKind::ALL`] order.
    pub counts: Vec<(EntityKind, usize)>,
    pub rendered_framebuffers: usize,
    pub pending_events: usize,
}

impl SceneSummary {
    pub fn count(&self, kind: EntityKind) -> usize {
        self.counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, n)| *n)
    }
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scene: entities={}", self.entity_count)?;
        for (kind, n) in self.counts.iter().filter(|(_, n)| *n > 0) {
            write!(f, " {kind}={n}")?;
        }
        write!(
            f,
            " rendered={} pending_events={}",
            self.rendered_framebuffers, self.pending_events
        )
    }
}

/// Detailed info about a single entity.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub name: String,
    pub kind: EntityKind,
    pub type_name: String,
    pub properties: Vec<(String, PropertyValue)>,
    /// Relation name and bound entity, `None` while unbound.
    pub bindings: Vec<(&'static str, Option<String>)>,
    /// Width and height of a rendered frame buffer.
    pub dimensions: Option<(u32, u32)>,
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.name, self.type_name)?;
        if let Some((w, h)) = self.dimensions {
            write!(f, " {w}x{h}")?;
        }
        for (key, value) in &self.properties {
            write!(f, "\n  {key} = {value}")?;
        }
        for (relation, target) in &self.bindings {
            write!(f, "\n  -> {relation}: {}", target.as_deref().unwrap_or("<unbound>"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raystage_kernel::schema::PERSPECTIVE_CAMERA;
    use raystage_shading::PluginRegistry;

    fn scene() -> Scene {
        let mut plugins = PluginRegistry::new();
        plugins.open("PlasticShader").unwrap();
        let mut scene = Scene::new();
        scene.create_camera("cam1", PERSPECTIVE_CAMERA).unwrap();
        scene.create_shader(&plugins, "floor_shader", "PlasticShader").unwrap();
        scene.create_mesh("floor_mesh", "primitive:plane").unwrap();
        scene.create_instance("floor1", "floor_mesh").unwrap();
        scene.assign_shader("floor1", "floor_shader").unwrap();
        scene.create_framebuffer("fb1", "rgba").unwrap();
        scene.create_renderer("ren1").unwrap();
        scene.assign_camera("ren1", "cam1").unwrap();
        scene.create_object_group("floors").unwrap();
        scene.add_to_group("floors", "floor1").unwrap();
        scene.assign_reflect_target("floor1", "floors").unwrap();
        scene
    }

    #[test]
    fn summary_empty_scene() {
        let summary = SceneInspector::summary(&Scene::new());
        assert_eq!(summary.entity_count, 0);
        assert_eq!(summary.rendered_framebuffers, 0);
        assert_eq!(summary.to_string(), "Scene: entities=0 rendered=0 pending_events=0");
    }

    #[test]
    fn summary_counts_kinds() {
        let summary = SceneInspector::summary(&scene());
        assert_eq!(summary.entity_count, 7);
        assert_eq!(summary.count(EntityKind::Camera), 1);
        assert_eq!(summary.count(EntityKind::Light), 0);
        assert_eq!(summary.count(EntityKind::ObjectGroup), 1);
        // 7 creations + 3 bindings + 1 group member
        assert_eq!(summary.pending_events, 11);
    }

    #[test]
    fn describe_renderer_bindings() {
        let info = SceneInspector::describe(&scene(), "ren1").unwrap();
        assert_eq!(info.kind, EntityKind::Renderer);
        assert_eq!(
            info.bindings,
            vec![("camera", Some("cam1".to_string())), ("framebuffer", None)]
        );
        let text = info.to_string();
        assert!(text.contains("-> framebuffer: <unbound>"));
        assert!(text.contains("resolution = 320 240"));
    }

    #[test]
    fn describe_instance() {
        let info = SceneInspector::describe(&scene(), "floor1").unwrap();
        assert_eq!(info.type_name, "floor_mesh");
        assert_eq!(info.bindings[1], ("shader", Some("floor_shader".to_string())));
        assert_eq!(info.bindings[2], ("reflect_target", Some("floors".to_string())));
        assert_eq!(info.bindings[3], ("refract_target", None));
    }

    #[test]
    fn describe_group_lists_members() {
        let info = SceneInspector::describe(&scene(), "floors").unwrap();
        assert_eq!(info.kind, EntityKind::ObjectGroup);
        assert_eq!(info.bindings, vec![("member", Some("floor1".to_string()))]);
        assert!(info.to_string().starts_with("object group 'floors' ()"));
    }

    #[test]
    fn describe_unknown() {
        assert!(matches!(
            SceneInspector::describe(&scene(), "nope"),
            Err(SceneError::UnknownEntity(_))
        ));
    }
}

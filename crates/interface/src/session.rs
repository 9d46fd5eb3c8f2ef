use crate::command::Command;
use crate::error::EngineError;
use raystage_assets::{FileMeshSource, MeshSource};
use raystage_kernel::{FrameBuffer, Scene, SceneError, kind};
use raystage_render::{RenderOptions, RenderReport};
use raystage_shading::PluginRegistry;
use std::path::{Path, PathBuf};

/// Everything commands act on: opened plugins, the scene, where meshes come
/// from and how renders are dispatched.
pub struct Session {
    plugins: PluginRegistry,
    scene: Scene,
    meshes: Box<dyn MeshSource>,
    /// Relative save paths resolve against this directory.
    base_dir: PathBuf,
    options: RenderOptions,
    reports: Vec<RenderReport>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Built-in plugins, meshes and outputs relative to the working directory.
    pub fn new() -> Self {
        Self {
            plugins: PluginRegistry::new(),
            scene: Scene::new(),
            meshes: Box::new(FileMeshSource::default()),
            base_dir: PathBuf::new(),
            options: RenderOptions::default(),
            reports: Vec::new(),
        }
    }

    /// Resolve relative mesh and output paths against `dir`, the way a
    /// script refers to files next to itself.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.meshes = Box::new(FileMeshSource::new(dir.clone()));
        self.base_dir = dir;
        self
    }

    pub fn with_mesh_source(mut self, source: Box<dyn MeshSource>) -> Self {
        self.meshes = source;
        self
    }

    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Reports of every render completed in this session, oldest first.
    pub fn reports(&self) -> &[RenderReport] {
        &self.reports
    }

    /// The contents of the frame buffer named `name`.
    pub fn framebuffer(&self, name: &str) -> Result<&FrameBuffer, EngineError> {
        let handle = self.scene.resolve_as::<kind::FrameBuffer>(name)?;
        self.scene
            .framebuffer(handle)
            .ok_or_else(|| SceneError::UnknownEntity(name.into()).into())
    }

    /// Apply a single command.
    pub fn apply(&mut self, command: &Command) -> Result<(), EngineError> {
        tracing::debug!(%command, "apply");
        let scene = &mut self.scene;
        match command {
            Command::OpenPlugin(name) => self.plugins.open(name)?,
            Command::NewCamera { name, type_name } => {
                scene.create_camera(name, type_name)?;
            }
            Command::NewLight { name, type_name } => {
                scene.create_light(name, type_name)?;
            }
            Command::NewShader { name, type_name } => {
                scene.create_shader(&self.plugins, name, type_name)?;
            }
            Command::NewMesh { name, path } => {
                scene.create_mesh(name, &path.to_string_lossy())?;
            }
            Command::NewObjectInstance { name, mesh } => {
                scene.create_instance(name, mesh)?;
            }
            Command::NewObjectGroup(name) => {
                scene.create_object_group(name)?;
            }
            Command::AddObjectToGroup { group, instance } => {
                scene.add_to_group(group, instance)?;
            }
            Command::NewFrameBuffer { name, layout } => {
                scene.create_framebuffer(name, layout)?;
            }
            Command::NewRenderer(name) => {
                scene.create_renderer(name)?;
            }
            Command::SetProperty { entity, key, value } => {
                scene.set_property(entity, key, *value)?;
            }
            Command::AssignShader { instance, shader } => {
                scene.assign_shader(instance, shader)?;
            }
            Command::AssignCamera { renderer, camera } => {
                scene.assign_camera(renderer, camera)?;
            }
            Command::AssignFrameBuffer {
                renderer,
                framebuffer,
            } => {
                scene.assign_framebuffer(renderer, framebuffer)?;
            }
            Command::AssignReflectTarget { instance, group } => {
                scene.assign_reflect_target(instance, group)?;
            }
            Command::AssignRefractTarget { instance, group } => {
                scene.assign_refract_target(instance, group)?;
            }
            Command::RenderScene(renderer) => {
                let report =
                    raystage_render::render(scene, renderer, &*self.meshes, &self.options)?;
                self.reports.push(report);
            }
            Command::SaveFrameBuffer { framebuffer, path } => {
                self.save_framebuffer(framebuffer, path)?;
            }
        }
        Ok(())
    }

    /// Write the frame buffer named `name` to `path`.
    pub fn save_framebuffer(&self, name: &str, path: &Path) -> Result<PathBuf, EngineError> {
        let fb = self.framebuffer(name)?;
        let path = self.base_dir.join(path);
        raystage_persist::save(fb, &path).map_err(|source| EngineError::Save {
            framebuffer: name.to_string(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_needs_open_plugin() {
        let mut session = Session::new();
        let new_shader = Command::NewShader {
            name: "floor".into(),
            type_name: "PlasticShader".into(),
        };
        assert!(matches!(
            session.apply(&new_shader),
            Err(EngineError::Scene(SceneError::Plugin(_)))
        ));
        session
            .apply(&Command::OpenPlugin("PlasticShader".into()))
            .unwrap();
        session.apply(&new_shader).unwrap();
        assert!(session.plugins().is_open("PlasticShader"));
    }

    #[test]
    fn unknown_plugin_is_plugin_error() {
        let mut session = Session::new();
        assert!(matches!(
            session.apply(&Command::OpenPlugin("NoSuchShader".into())),
            Err(EngineError::Plugin(_))
        ));
    }

    #[test]
    fn saving_unrendered_buffer_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = Session::new().with_base_dir(tmp.path());
        session
            .apply(&Command::NewFrameBuffer {
                name: "fb".into(),
                layout: "rgb".into(),
            })
            .unwrap();
        let err = session
            .apply(&Command::SaveFrameBuffer {
                framebuffer: "fb".into(),
                path: "out.rsfb".into(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Save {
                source: raystage_persist::PersistError::EmptyFrameBuffer,
                ..
            }
        ));
        assert!(!tmp.path().join("out.rsfb").exists());
    }

    #[test]
    fn framebuffer_lookup_checks_kind() {
        let mut session = Session::new();
        session.apply(&Command::NewRenderer("ren".into())).unwrap();
        assert!(matches!(
            session.framebuffer("ren"),
            Err(EngineError::Scene(SceneError::KindMismatch { .. }))
        ));
    }
}

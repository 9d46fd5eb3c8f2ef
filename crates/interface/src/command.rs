use crate::error::CommandError;
use crate::script::quote;
use crate::session::Session;
use raystage_common::PropertyValue;
use std::fmt;
use std::path::PathBuf;

/// One scene-building or rendering command.
///
/// `Display` writes the command as a script line that [`crate::parse`]
/// reads back.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    OpenPlugin(String),
    NewCamera { name: String, type_name: String },
    NewLight { name: String, type_name: String },
    NewShader { name: String, type_name: String },
    NewMesh { name: String, path: PathBuf },
    NewObjectInstance { name: String, mesh: String },
    NewObjectGroup(String),
    AddObjectToGroup { group: String, instance: String },
    NewFrameBuffer { name: String, layout: String },
    NewRenderer(String),
    SetProperty {
        entity: String,
        key: String,
        value: PropertyValue,
    },
    AssignShader { instance: String, shader: String },
    AssignCamera { renderer: String, camera: String },
    AssignFrameBuffer { renderer: String, framebuffer: String },
    AssignReflectTarget { instance: String, group: String },
    AssignRefractTarget { instance: String, group: String },
    RenderScene(String),
    SaveFrameBuffer { framebuffer: String, path: PathBuf },
}

impl Command {
    /// Script keyword of the command.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::OpenPlugin(_) => "OpenPlugin",
            Self::NewCamera { .. } => "NewCamera",
            Self::NewLight { .. } => "NewLight",
            Self::NewShader { .. } => "NewShader",
            Self::NewMesh { .. } => "NewMesh",
            Self::NewObjectInstance { .. } => "NewObjectInstance",
            Self::NewObjectGroup(_) => "NewObjectGroup",
            Self::AddObjectToGroup { .. } => "AddObjectToGroup",
            Self::NewFrameBuffer { .. } => "NewFrameBuffer",
            Self::NewRenderer(_) => "NewRenderer",
            Self::SetProperty { value, .. } => match value.arity() {
                1 => "SetProperty1",
                2 => "SetProperty2",
                _ => "SetProperty3",
            },
            Self::AssignShader { .. } => "AssignShader",
            Self::AssignCamera { .. } => "AssignCamera",
            Self::AssignFrameBuffer { .. } => "AssignFrameBuffer",
            Self::AssignReflectTarget { .. } => "AssignReflectTarget",
            Self::AssignRefractTarget { .. } => "AssignRefractTarget",
            Self::RenderScene(_) => "RenderScene",
            Self::SaveFrameBuffer { .. } => "SaveFrameBuffer",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        let args: Vec<String> = match self {
            Self::OpenPlugin(name)
            | Self::NewObjectGroup(name)
            | Self::NewRenderer(name)
            | Self::RenderScene(name) => vec![quote(name)],
            Self::NewCamera { name, type_name }
            | Self::NewLight { name, type_name }
            | Self::NewShader { name, type_name } => vec![quote(name), quote(type_name)],
            Self::NewMesh { name, path } => {
                vec![quote(name), quote(&path.display().to_string())]
            }
            Self::NewObjectInstance { name, mesh } => vec![quote(name), quote(mesh)],
            Self::AddObjectToGroup { group, instance } => vec![quote(group), quote(instance)],
            Self::NewFrameBuffer { name, layout } => vec![quote(name), quote(layout)],
            Self::SetProperty { entity, key, value } => {
                let mut args = vec![quote(entity), quote(key)];
                args.extend(value.as_slice().iter().map(|v| v.to_string()));
                args
            }
            Self::AssignShader { instance, shader } => vec![quote(instance), quote(shader)],
            Self::AssignCamera { renderer, camera } => vec![quote(renderer), quote(camera)],
            Self::AssignFrameBuffer {
                renderer,
                framebuffer,
            } => vec![quote(renderer), quote(framebuffer)],
            Self::AssignReflectTarget { instance, group }
            | Self::AssignRefractTarget { instance, group } => {
                vec![quote(instance), quote(group)]
            }
            Self::SaveFrameBuffer { framebuffer, path } => {
                vec![quote(framebuffer), quote(&path.display().to_string())]
            }
        };
        for arg in args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A queue of commands, applied in order by [`SceneInterface::run`].
///
/// The methods mirror the script keywords and only record the command;
/// nothing is validated until the queue runs.
#[derive(Debug, Clone, Default)]
pub struct SceneInterface {
    commands: Vec<Command>,
}

impl SceneInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn open_plugin(&mut self, name: &str) -> &mut Self {
        self.push(Command::OpenPlugin(name.into()))
    }

    pub fn new_camera(&mut self, name: &str, type_name: &str) -> &mut Self {
        self.push(Command::NewCamera {
            name: name.into(),
            type_name: type_name.into(),
        })
    }

    pub fn new_light(&mut self, name: &str, type_name: &str) -> &mut Self {
        self.push(Command::NewLight {
            name: name.into(),
            type_name: type_name.into(),
        })
    }

    pub fn new_shader(&mut self, name: &str, type_name: &str) -> &mut Self {
        self.push(Command::NewShader {
            name: name.into(),
            type_name: type_name.into(),
        })
    }

    pub fn new_mesh(&mut self, name: &str, path: impl Into<PathBuf>) -> &mut Self {
        self.push(Command::NewMesh {
            name: name.into(),
            path: path.into(),
        })
    }

    pub fn new_object_instance(&mut self, name: &str, mesh: &str) -> &mut Self {
        self.push(Command::NewObjectInstance {
            name: name.into(),
            mesh: mesh.into(),
        })
    }

    pub fn new_object_group(&mut self, name: &str) -> &mut Self {
        self.push(Command::NewObjectGroup(name.into()))
    }

    pub fn add_object_to_group(&mut self, group: &str, instance: &str) -> &mut Self {
        self.push(Command::AddObjectToGroup {
            group: group.into(),
            instance: instance.into(),
        })
    }

    pub fn new_framebuffer(&mut self, name: &str, layout: &str) -> &mut Self {
        self.push(Command::NewFrameBuffer {
            name: name.into(),
            layout: layout.into(),
        })
    }

    pub fn new_renderer(&mut self, name: &str) -> &mut Self {
        self.push(Command::NewRenderer(name.into()))
    }

    pub fn set_property(&mut self, entity: &str, key: &str, value: PropertyValue) -> &mut Self {
        self.push(Command::SetProperty {
            entity: entity.into(),
            key: key.into(),
            value,
        })
    }

    pub fn set_property1(&mut self, entity: &str, key: &str, x: f32) -> &mut Self {
        self.set_property(entity, key, PropertyValue::scalar(x))
    }

    pub fn set_property2(&mut self, entity: &str, key: &str, x: f32, y: f32) -> &mut Self {
        self.set_property(entity, key, PropertyValue::vec2(x, y))
    }

    pub fn set_property3(&mut self, entity: &str, key: &str, x: f32, y: f32, z: f32) -> &mut Self {
        self.set_property(entity, key, PropertyValue::vec3(x, y, z))
    }

    pub fn assign_shader(&mut self, instance: &str, shader: &str) -> &mut Self {
        self.push(Command::AssignShader {
            instance: instance.into(),
            shader: shader.into(),
        })
    }

    pub fn assign_camera(&mut self, renderer: &str, camera: &str) -> &mut Self {
        self.push(Command::AssignCamera {
            renderer: renderer.into(),
            camera: camera.into(),
        })
    }

    pub fn assign_framebuffer(&mut self, renderer: &str, framebuffer: &str) -> &mut Self {
        self.push(Command::AssignFrameBuffer {
            renderer: renderer.into(),
            framebuffer: framebuffer.into(),
        })
    }

    /// Reflections off `instance` only see the members of `group`.
    pub fn assign_reflect_target(&mut self, instance: &str, group: &str) -> &mut Self {
        self.push(Command::AssignReflectTarget {
            instance: instance.into(),
            group: group.into(),
        })
    }

    /// Refractions through `instance` only see the members of `group`.
    pub fn assign_refract_target(&mut self, instance: &str, group: &str) -> &mut Self {
        self.push(Command::AssignRefractTarget {
            instance: instance.into(),
            group: group.into(),
        })
    }

    pub fn render_scene(&mut self, renderer: &str) -> &mut Self {
        self.push(Command::RenderScene(renderer.into()))
    }

    pub fn save_framebuffer(&mut self, framebuffer: &str, path: impl Into<PathBuf>) -> &mut Self {
        self.push(Command::SaveFrameBuffer {
            framebuffer: framebuffer.into(),
            path: path.into(),
        })
    }

    /// Apply every queued command in order. Returns the number applied.
    ///
    /// Stops at the first failure; commands after it are not applied and
    /// the queue is left as it was.
    pub fn run(&self, session: &mut Session) -> Result<usize, CommandError> {
        for (index, command) in self.commands.iter().enumerate() {
            session
                .apply(command)
                .map_err(|source| CommandError {
                    index,
                    command: command.clone(),
                    source,
                })?;
        }
        tracing::debug!(commands = self.commands.len(), "run complete");
        Ok(self.commands.len())
    }

    /// The queued commands as a script, one per line.
    pub fn print(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            out.push_str(&command.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapters_set_arity() {
        let mut si = SceneInterface::new();
        si.set_property1("ren", "cast_shadow", 0.0)
            .set_property2("ren", "resolution", 64.0, 48.0)
            .set_property3("cam", "translate", 0.0, 1.5, 7.0);
        let arities: Vec<usize> = si
            .commands()
            .iter()
            .map(|c| match c {
                Command::SetProperty { value, .. } => value.arity(),
                _ => 0,
            })
            .collect();
        assert_eq!(arities, vec![1, 2, 3]);
    }

    #[test]
    fn print_lists_commands_in_order() {
        let mut si = SceneInterface::new();
        si.open_plugin("PlasticShader")
            .new_camera("cam1", "PerspectiveCamera")
            .set_property3("cam1", "translate", 0.0, 1.5, 7.0)
            .new_mesh("floor", "meshes/my floor.mesh")
            .render_scene("ren1");
        assert_eq!(
            si.print(),
            "OpenPlugin PlasticShader\n\
             NewCamera cam1 PerspectiveCamera\n\
             SetProperty3 cam1 translate 0 1.5 7\n\
             NewMesh floor \"meshes/my floor.mesh\"\n\
             RenderScene ren1\n"
        );
    }

    #[test]
    fn group_commands_print_as_script() {
        let mut si = SceneInterface::new();
        si.new_object_group("walls")
            .add_object_to_group("walls", "wall1")
            .assign_reflect_target("ball1", "walls")
            .assign_refract_target("ball1", "walls");
        assert_eq!(
            si.print(),
            "NewObjectGroup walls\n\
             AddObjectToGroup walls wall1\n\
             AssignReflectTarget ball1 walls\n\
             AssignRefractTarget ball1 walls\n"
        );
    }
}

use crate::command::Command;
use raystage_kernel::SceneError;
use raystage_persist::PersistError;
use raystage_render::RenderError;
use raystage_shading::PluginError;

/// Errors from applying one command to a session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("saving frame buffer '{framebuffer}' failed")]
    Save {
        framebuffer: String,
        #[source]
        source: PersistError,
    },
}

/// The command that stopped a run, with its position in the queue.
#[derive(Debug, thiserror::Error)]
#[error("command #{index} `{command}` failed")]
pub struct CommandError {
    pub index: usize,
    pub command: Command,
    #[source]
    pub source: EngineError,
}

use crate::job::RenderState;
use raystage_assets::MeshError;
use raystage_kernel::SceneError;

/// Errors from a render invocation. Any of them leaves the frame buffer untouched.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer '{renderer}' has no {missing} bound")]
    RendererNotBound {
        renderer: String,
        missing: &'static str,
    },
    #[error("geometry of mesh '{mesh}' could not be resolved")]
    Geometry {
        mesh: String,
        #[source]
        source: MeshError,
    },
    #[error("renderer '{renderer}' resolution {width}x{height} is too large to allocate")]
    FrameTooLarge {
        renderer: String,
        width: u32,
        height: u32,
    },
    #[error("render is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: RenderState,
        actual: RenderState,
    },
    #[error("a render worker panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Scene(#[from] SceneError),
}

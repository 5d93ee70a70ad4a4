use thiserror::Error;

use crate::gpu::GpuHandle;

/// Errors reported by a GPU resource collaborator.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The handle was never issued or has already been released.
    #[error("unknown GPU handle: {0}")]
    UnknownHandle(GpuHandle),

    #[error("texture upload failed: {0}")]
    Upload(String),

    /// Mesh data referenced something out of range while compiling.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

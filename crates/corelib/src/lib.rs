//! Core shared types: math re-exports, GPU handles, errors (renderer-agnostic).

pub use glam::{Vec3, vec3};

pub mod error;
pub mod gpu;

pub use error::{CoreError, CoreResult};
pub use gpu::{GpuHandle, ListHandle, TextureHandle};

/// Vertex position or normal vector, as read from a model file.
pub type Point3 = Vec3;

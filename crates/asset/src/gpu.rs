//! Contract with the GPU-side collaborator, plus the context threaded through loads.

use corelib::{CoreResult, GpuHandle, ListHandle, TextureHandle};

use crate::{mesh::Mesh, texture::ImageDecoder, texture::TextureData};

/// Owner of GPU-resident resources (textures, compiled meshes).
///
/// Every handle returned by `upload_texture`/`compile_mesh` must be passed to
/// `release` exactly once. `Mesh::release` does that for everything a mesh owns.
pub trait GpuResources {
    fn upload_texture(&mut self, texture: &TextureData) -> CoreResult<TextureHandle>;
    fn compile_mesh(&mut self, mesh: &Mesh) -> CoreResult<ListHandle>;
    fn release(&mut self, handle: GpuHandle) -> CoreResult<()>;
}

/// Collaborators used while loading meshes and material libraries.
pub struct LoadContext<'a> {
    pub gpu: &'a mut dyn GpuResources,
    pub images: &'a dyn ImageDecoder,
}

impl<'a> LoadContext<'a> {
    pub fn new(gpu: &'a mut dyn GpuResources, images: &'a dyn ImageDecoder) -> Self {
        Self { gpu, images }
    }
}

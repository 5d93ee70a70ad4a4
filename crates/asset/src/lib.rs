//! Asset loading: Wavefront OBJ meshes, MTL material libraries, textures and
//! per-frame OBJ animation sequences.
//!
//! Loads are synchronous. GPU-side work (texture upload, mesh compilation)
//! goes through the [`GpuResources`] collaborator passed in a [`LoadContext`].

pub mod anim;
pub mod error;
pub mod face;
pub mod gpu;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod reader;
pub mod texture;

#[cfg(test)]
pub(crate) mod testing;

pub use anim::{AnimationSequence, FrameOrder, load_animation};
pub use error::{AssetError, AssetResult};
pub use gpu::{GpuResources, LoadContext};
pub use material::{IllumModel, Material};
pub use mesh::{FaceIndexGroup, Mesh, TexCoord};
pub use obj::load_mesh;
pub use texture::{ImageDecoder, ImageFileDecoder, TextureData};

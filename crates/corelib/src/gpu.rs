//! Opaque handles to GPU-side resources.
//!
//! A handle value of `0` is valid. Absence is always spelled `Option<_>`.

use std::fmt;

/// Handle to an uploaded texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Handle to a compiled mesh representation (display list).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListHandle(pub u32);

/// Any releasable GPU resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuHandle {
    Texture(TextureHandle),
    List(ListHandle),
}

impl From<TextureHandle> for GpuHandle {
    fn from(h: TextureHandle) -> Self {
        GpuHandle::Texture(h)
    }
}

impl From<ListHandle> for GpuHandle {
    fn from(h: ListHandle) -> Self {
        GpuHandle::List(h)
    }
}

impl fmt::Display for GpuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuHandle::Texture(TextureHandle(id)) => write!(f, "texture#{id}"),
            GpuHandle::List(ListHandle(id)) => write!(f, "list#{id}"),
        }
    }
}

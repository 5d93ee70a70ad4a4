//! Test doubles for the GPU and image-decode collaborators.

use std::{
    cell::RefCell,
    collections::HashSet,
    path::{Path, PathBuf},
};

use corelib::{CoreError, CoreResult, GpuHandle, ListHandle, TextureHandle};

use crate::{
    gpu::GpuResources,
    mesh::Mesh,
    texture::{ImageDecoder, TextureData},
};

/// Issues sequential handles starting at 0 and records every call.
#[derive(Debug, Default)]
pub(crate) struct CountingGpu {
    next: u32,
    pub live: HashSet<GpuHandle>,
    pub released: Vec<GpuHandle>,
    pub uploads: usize,
    pub compiles: usize,
    pub fail_uploads: bool,
}

impl CountingGpu {
    pub fn issue_texture(&mut self) -> TextureHandle {
        let handle = TextureHandle(self.next);
        self.next += 1;
        self.live.insert(handle.into());
        handle
    }

    pub fn each_released_once(&self) -> bool {
        let unique: HashSet<_> = self.released.iter().collect();
        unique.len() == self.released.len()
    }
}

impl GpuResources for CountingGpu {
    fn upload_texture(&mut self, _texture: &TextureData) -> CoreResult<TextureHandle> {
        if self.fail_uploads {
            return Err(CoreError::Upload("uploads disabled".into()));
        }
        self.uploads += 1;
        Ok(self.issue_texture())
    }

    fn compile_mesh(&mut self, _mesh: &Mesh) -> CoreResult<ListHandle> {
        self.compiles += 1;
        let handle = ListHandle(self.next);
        self.next += 1;
        self.live.insert(handle.into());
        Ok(handle)
    }

    fn release(&mut self, handle: GpuHandle) -> CoreResult<()> {
        if self.live.remove(&handle) {
            self.released.push(handle);
            Ok(())
        } else {
            Err(CoreError::UnknownHandle(handle))
        }
    }
}

/// Decodes any existing file to a small checkerboard; remembers requested paths.
#[derive(Debug, Default)]
pub(crate) struct StubDecoder {
    pub requested: RefCell<Vec<PathBuf>>,
}

impl ImageDecoder for StubDecoder {
    fn decode(&self, path: &Path) -> anyhow::Result<TextureData> {
        self.requested.borrow_mut().push(path.to_path_buf());
        anyhow::ensure!(path.is_file(), "no image at {}", path.display());
        Ok(TextureData::checkerboard(8))
    }
}

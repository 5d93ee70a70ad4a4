//! Headless GPU resource registry.
//!
//! Implements the [`GpuResources`] collaborator without a device: uploaded
//! textures are kept as RGBA8 buffers and meshes are compiled into indexed
//! triangle lists (`DrawList`) ready to be copied into vertex/index buffers.

use std::collections::HashMap;

use asset::{GpuResources, Material, Mesh, TextureData};
use bytemuck::{Pod, Zeroable};
use corelib::{CoreError, CoreResult, GpuHandle, ListHandle, TextureHandle};

/// Vertex: position + normal + uv.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Run of consecutive faces drawn with the same material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawBatch {
    pub material: Option<usize>,
    pub texture: Option<TextureHandle>,
    pub first_index: u32,
    pub index_count: u32,
}

/// Compiled form of a mesh: deduplicated vertices, triangle indices (CCW as
/// authored) and material batches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub batches: Vec<DrawBatch>,
}

impl DrawList {
    /// Build from a parsed mesh. Quads are split into two triangles.
    pub fn build(mesh: &Mesh) -> CoreResult<Self> {
        let mut list = DrawList::default();
        let mut unique: HashMap<(u32, u32, u32), u32> = HashMap::new();

        for face in &mesh.faces {
            let mut corners = [0u32; 4];
            for (slot, corner) in corners.iter_mut().take(face.corner_count()).enumerate() {
                let key = (face.positions[slot], face.texcoords[slot], face.normal);
                *corner = match unique.get(&key) {
                    Some(&idx) => idx,
                    None => {
                        let idx = u32::try_from(list.vertices.len()).map_err(|_| {
                            CoreError::InvalidMesh(format!("too many vertices (>{})", u32::MAX))
                        })?;
                        list.vertices.push(make_vertex(mesh, key)?);
                        unique.insert(key, idx);
                        idx
                    }
                };
            }

            let first_index = list.indices.len() as u32;
            for tri in face.triangles() {
                list.indices.extend(tri.iter().map(|&slot| corners[slot]));
            }
            let added = list.indices.len() as u32 - first_index;

            match list.batches.last_mut() {
                Some(batch) if batch.material == face.material => batch.index_count += added,
                _ => list.batches.push(DrawBatch {
                    material: face.material,
                    texture: face
                        .material
                        .and_then(|m| mesh.materials.get(m))
                        .and_then(Material::texture),
                    first_index,
                    index_count: added,
                }),
            }
        }

        Ok(list)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

fn make_vertex(mesh: &Mesh, (p, t, n): (u32, u32, u32)) -> CoreResult<Vertex> {
    let pos = lookup(&mesh.positions, p, "position")?.to_array();
    let normal = match n {
        0 => [0.0, 0.0, 0.0],
        n => lookup(&mesh.normals, n, "normal")?.to_array(),
    };
    let uv = match t {
        0 => [0.0, 0.0],
        t => {
            let tc = lookup(&mesh.texcoords, t, "texcoord")?;
            [tc.u, tc.v]
        }
    };
    Ok(Vertex { pos, normal, uv })
}

/// 1-based lookup.
fn lookup<T: Copy>(items: &[T], index: u32, what: &str) -> CoreResult<T> {
    index
        .checked_sub(1)
        .and_then(|i| items.get(i as usize))
        .copied()
        .ok_or_else(|| {
            CoreError::InvalidMesh(format!(
                "{what} index {index} out of range ({} available)",
                items.len()
            ))
        })
}

/// Texture pixels as uploaded.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Owns every uploaded texture and compiled list until it is released.
/// Handles are issued sequentially from 0.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    textures: HashMap<TextureHandle, GpuTexture>,
    lists: HashMap<ListHandle, DrawList>,
    next_texture: u32,
    next_list: u32,
    released: usize,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle)
    }

    pub fn draw_list(&self, handle: ListHandle) -> Option<&DrawList> {
        self.lists.get(&handle)
    }

    /// Handles issued and not yet released.
    pub fn live_handles(&self) -> usize {
        self.textures.len() + self.lists.len()
    }

    pub fn released_count(&self) -> usize {
        self.released
    }
}

impl GpuResources for ResourceRegistry {
    fn upload_texture(&mut self, texture: &TextureData) -> CoreResult<TextureHandle> {
        if !texture.is_valid() {
            return Err(CoreError::Upload(format!(
                "{}x{} texture with {} bytes",
                texture.width,
                texture.height,
                texture.data.len()
            )));
        }

        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            handle,
            GpuTexture {
                width: texture.width,
                height: texture.height,
                pixels: texture.data.clone(),
            },
        );
        log::debug!(
            "Uploaded {}x{} texture as {}",
            texture.width,
            texture.height,
            GpuHandle::from(handle)
        );
        Ok(handle)
    }

    fn compile_mesh(&mut self, mesh: &Mesh) -> CoreResult<ListHandle> {
        let list = DrawList::build(mesh)?;
        let handle = ListHandle(self.next_list);
        self.next_list += 1;
        log::debug!(
            "Compiled mesh '{}' into {}: {} vertices, {} triangles, {} batches",
            mesh.name,
            GpuHandle::from(handle),
            list.vertices.len(),
            list.triangle_count(),
            list.batches.len()
        );
        self.lists.insert(handle, list);
        Ok(handle)
    }

    fn release(&mut self, handle: GpuHandle) -> CoreResult<()> {
        let found = match handle {
            GpuHandle::Texture(h) => self.textures.remove(&h).is_some(),
            GpuHandle::List(h) => self.lists.remove(&h).is_some(),
        };
        if !found {
            return Err(CoreError::UnknownHandle(handle));
        }
        self.released += 1;
        Ok(())
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        let live = self.live_handles();
        if live > 0 {
            log::warn!("ResourceRegistry dropped with {} live handle(s)", live);
        }
    }
}

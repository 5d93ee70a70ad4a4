//! MTL material libraries.

use std::{
    io::BufRead,
    mem,
    path::{Path, PathBuf},
};

use corelib::TextureHandle;

use crate::{error::AssetResult, gpu::LoadContext, mesh::Mesh, reader::TokenReader};

/// MTL `illum` models 0..=10.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IllumModel {
    /// 0: color on, ambient off
    ColorOnly,
    /// 1: color on, ambient on
    Ambient,
    /// 2: highlight on
    #[default]
    Highlight,
    /// 3
    RayTraceReflection,
    /// 4
    GlassRayTrace,
    /// 5
    FresnelRayTrace,
    /// 6
    RefractionRayTrace,
    /// 7
    RefractionFresnelRayTrace,
    /// 8
    Reflection,
    /// 9
    Glass,
    /// 10: casts shadows onto invisible surfaces
    ShadowMatte,
    Other(i32),
}

impl IllumModel {
    pub fn from_id(id: i32) -> Self {
        match id {
            0 => IllumModel::ColorOnly,
            1 => IllumModel::Ambient,
            2 => IllumModel::Highlight,
            3 => IllumModel::RayTraceReflection,
            4 => IllumModel::GlassRayTrace,
            5 => IllumModel::FresnelRayTrace,
            6 => IllumModel::RefractionRayTrace,
            7 => IllumModel::RefractionFresnelRayTrace,
            8 => IllumModel::Reflection,
            9 => IllumModel::Glass,
            10 => IllumModel::ShadowMatte,
            other => IllumModel::Other(other),
        }
    }

    pub fn id(self) -> i32 {
        match self {
            IllumModel::ColorOnly => 0,
            IllumModel::Ambient => 1,
            IllumModel::Highlight => 2,
            IllumModel::RayTraceReflection => 3,
            IllumModel::GlassRayTrace => 4,
            IllumModel::FresnelRayTrace => 5,
            IllumModel::RefractionRayTrace => 6,
            IllumModel::RefractionFresnelRayTrace => 7,
            IllumModel::Reflection => 8,
            IllumModel::Glass => 9,
            IllumModel::ShadowMatte => 10,
            IllumModel::Other(id) => id,
        }
    }
}

/// A named `newmtl` block.
#[derive(Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// `d`
    pub alpha: f32,
    /// `Ns`
    pub ns: f32,
    /// `Ni`
    pub ni: f32,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub illum: IllumModel,
    /// Resolved `map_Kd` path, set once the texture is uploaded.
    pub texture_path: Option<PathBuf>,
    texture: Option<TextureHandle>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alpha: 1.0,
            ns: 0.0,
            ni: 1.0,
            ambient: [0.2, 0.2, 0.2],
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.0, 0.0, 0.0],
            illum: IllumModel::default(),
            texture_path: None,
            texture: None,
        }
    }

    /// Uploaded diffuse texture. `None` means no texture; handle 0 is valid.
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub(crate) fn set_texture(&mut self, handle: TextureHandle) {
        self.texture = Some(handle);
    }

    pub(crate) fn take_texture(&mut self) -> Option<TextureHandle> {
        self.texture.take()
    }
}

/// In-progress `newmtl` block. Only committed if a field was set.
struct MtlBuffer {
    pending: Material,
    dirty: bool,
}

impl MtlBuffer {
    fn new() -> Self {
        Self {
            pending: Material::new(""),
            dirty: false,
        }
    }

    fn commit(&mut self, materials: &mut Vec<Material>) {
        if self.dirty {
            materials.push(mem::replace(&mut self.pending, Material::new("")));
        }
        self.dirty = false;
    }
}

/// Parse the MTL file at `path`, appending its materials to `mesh`.
///
/// `map_Kd` paths are resolved against the library's directory. A texture
/// that cannot be decoded or uploaded leaves the material untextured.
pub fn load_material_library(
    path: &Path,
    mesh: &mut Mesh,
    ctx: &mut LoadContext<'_>,
) -> AssetResult<()> {
    let mut reader = TokenReader::open(path)?;
    let base_dir = path.parent().unwrap_or(Path::new(""));

    let before = mesh.materials.len();
    let result = parse_mtl(&mut reader, base_dir, &mut mesh.materials, ctx);
    mesh.has_materials = !mesh.materials.is_empty();

    log::debug!(
        "Material library {:?}: {} material(s)",
        path,
        mesh.materials.len() - before
    );
    result
}

/// Parse MTL records from `reader`. Materials read before a failure are kept
/// (and thereby owned by the caller, textures included).
pub fn parse_mtl<R: BufRead>(
    reader: &mut TokenReader<R>,
    base_dir: &Path,
    materials: &mut Vec<Material>,
    ctx: &mut LoadContext<'_>,
) -> AssetResult<()> {
    let mut buffer = MtlBuffer::new();
    let result = read_records(reader, base_dir, &mut buffer, materials, ctx);
    buffer.commit(materials);
    result
}

fn read_records<R: BufRead>(
    reader: &mut TokenReader<R>,
    base_dir: &Path,
    buffer: &mut MtlBuffer,
    materials: &mut Vec<Material>,
    ctx: &mut LoadContext<'_>,
) -> AssetResult<()> {
    while let Some(keyword) = reader.next_token()? {
        match keyword.as_str() {
            "newmtl" => {
                buffer.commit(materials);
                let name = reader.next_line()?.unwrap_or_default();
                buffer.pending = Material::new(name.trim());
            }
            "Ns" => {
                buffer.pending.ns = reader.read_float()?.unwrap_or(0.0);
                buffer.dirty = true;
            }
            "Ka" => {
                buffer.pending.ambient = reader.read_floats()?;
                buffer.dirty = true;
            }
            "Kd" => {
                buffer.pending.diffuse = reader.read_floats()?;
                buffer.dirty = true;
            }
            "Ks" => {
                buffer.pending.specular = reader.read_floats()?;
                buffer.dirty = true;
            }
            "Ni" => {
                buffer.pending.ni = reader.read_float()?.unwrap_or(0.0);
                buffer.dirty = true;
            }
            "d" => {
                buffer.pending.alpha = reader.read_float()?.unwrap_or(0.0);
                buffer.dirty = true;
            }
            "illum" => {
                buffer.pending.illum = IllumModel::from_id(reader.read_int()?.unwrap_or(0));
                buffer.dirty = true;
            }
            "map_Kd" => {
                let line = reader.next_line()?.unwrap_or_default();
                buffer.dirty = true;
                // Options (`-s 1 1 1`, ...) come first; the file name is last.
                match line.split_whitespace().last() {
                    Some(file) => {
                        let path = base_dir.join(file.replace('\\', "/"));
                        attach_texture(&mut buffer.pending, path, ctx);
                    }
                    None => log::warn!(
                        "{}:{}: map_Kd without a file name",
                        reader.path().display(),
                        reader.line_number()
                    ),
                }
            }
            other => {
                log::trace!(
                    "{}:{}: ignoring '{}'",
                    reader.path().display(),
                    reader.line_number(),
                    other
                );
                reader.skip_line();
            }
        }
    }
    Ok(())
}

fn attach_texture(material: &mut Material, path: PathBuf, ctx: &mut LoadContext<'_>) {
    if let Some(old) = material.take_texture() {
        if let Err(e) = ctx.gpu.release(old.into()) {
            log::warn!("Material '{}': failed to release texture: {}", material.name, e);
        }
    }
    material.texture_path = None;

    let data = match ctx.images.decode(&path) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("Material '{}': texture unavailable: {:#}", material.name, e);
            return;
        }
    };
    match ctx.gpu.upload_texture(&data) {
        Ok(handle) => {
            material.set_texture(handle);
            material.texture_path = Some(path);
        }
        Err(e) => log::warn!("Material '{}': {}", material.name, e),
    }
}

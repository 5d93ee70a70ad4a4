//! CPU-side mesh representation produced by the OBJ loader.

use std::io::{self, Write};
use std::path::PathBuf;

use corelib::{CoreResult, GpuHandle, ListHandle, Point3};

use crate::{face::FaceSyntax, gpu::GpuResources, material::Material};

/// Texture coordinate. `v` is stored flipped (`1 - v` from the file).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TexCoord {
    pub u: f32,
    pub v: f32,
}

impl TexCoord {
    /// OBJ puts `v = 0` at the bottom of the image; rows are stored top-down.
    pub fn from_obj(u: f32, v: f32) -> Self {
        Self { u, v: 1.0 - v }
    }
}

/// One triangle or quad. Indices are 1-based as in the file; `0` means
/// "no reference". Triangles leave slot 4 at `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceIndexGroup {
    pub positions: [u32; 4],
    pub texcoords: [u32; 4],
    /// Shared by every corner of the face.
    pub normal: u32,
    pub is_quad: bool,
    /// Material active when the face was parsed.
    pub material: Option<usize>,
    pub syntax: FaceSyntax,
}

impl FaceIndexGroup {
    const TRIANGLE: &'static [[usize; 3]] = &[[0, 1, 2]];
    const QUAD: &'static [[usize; 3]] = &[[0, 1, 2], [0, 2, 3]];

    pub fn corner_count(&self) -> usize {
        if self.is_quad { 4 } else { 3 }
    }

    pub fn position_indices(&self) -> &[u32] {
        &self.positions[..self.corner_count()]
    }

    pub fn texcoord_indices(&self) -> &[u32] {
        &self.texcoords[..self.corner_count()]
    }

    /// Corner slots of the triangles covering this face (quads split 0-1-2, 0-2-3).
    pub fn triangles(&self) -> &'static [[usize; 3]] {
        if self.is_quad { Self::QUAD } else { Self::TRIANGLE }
    }
}

impl std::fmt::Display for FaceIndexGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (&p, &t)) in self
            .position_indices()
            .iter()
            .zip(self.texcoord_indices())
            .enumerate()
        {
            if i > 0 {
                f.write_str(" ")?;
            }
            match self.syntax {
                FaceSyntax::Position => write!(f, "{p}")?,
                FaceSyntax::PositionNormal => write!(f, "{p}//{}", self.normal)?,
                FaceSyntax::PositionTexcoord => write!(f, "{p}/{t}")?,
                FaceSyntax::PositionTexcoordNormal => write!(f, "{p}/{t}/{}", self.normal)?,
            }
        }
        Ok(())
    }
}

/// A parsed OBJ file. Owns its materials and every GPU handle they hold.
///
/// Not `Clone`: a copy would share GPU handles. Call [`Mesh::release`] when done.
#[derive(Debug, Default)]
pub struct Mesh {
    pub name: String,
    pub path: Option<PathBuf>,
    pub positions: Vec<Point3>,
    pub normals: Vec<Point3>,
    pub texcoords: Vec<TexCoord>,
    pub faces: Vec<FaceIndexGroup>,
    pub materials: Vec<Material>,
    pub has_normals: bool,
    pub has_texcoords: bool,
    pub has_materials: bool,
    compiled: Option<ListHandle>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        let mut mesh = Self::default();
        mesh.name = name.into();
        mesh
    }

    /// Returns `true` if there is at least one position and one face.
    pub fn is_valid(&self) -> bool {
        !self.positions.is_empty() && !self.faces.is_empty()
    }

    /// Index of the first material called `name`.
    pub fn find_material(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    /// Handle of the compiled representation, if [`Mesh::compile`] was called.
    pub fn compiled(&self) -> Option<ListHandle> {
        self.compiled
    }

    /// Compile through the GPU collaborator, replacing any earlier compilation.
    pub fn compile(&mut self, gpu: &mut dyn GpuResources) -> CoreResult<ListHandle> {
        if let Some(old) = self.compiled.take() {
            gpu.release(old.into())?;
        }
        let handle = gpu.compile_mesh(self)?;
        self.compiled = Some(handle);
        Ok(handle)
    }

    /// Every GPU handle currently owned by this mesh.
    pub fn gpu_handles(&self) -> impl Iterator<Item = GpuHandle> + '_ {
        self.materials
            .iter()
            .filter_map(Material::texture)
            .map(GpuHandle::from)
            .chain(self.compiled.map(GpuHandle::from))
    }

    /// Release every GPU handle exactly once, then drop the mesh.
    ///
    /// All handles are attempted even if some fail; the first error is returned.
    pub fn release(mut self, gpu: &mut dyn GpuResources) -> CoreResult<()> {
        release_all(self.take_gpu_handles(), gpu)
    }

    pub(crate) fn take_gpu_handles(&mut self) -> Vec<GpuHandle> {
        self.materials
            .iter_mut()
            .filter_map(Material::take_texture)
            .map(GpuHandle::from)
            .chain(self.compiled.take().map(GpuHandle::from))
            .collect()
    }

    /// Human-readable listing of every record, in file order.
    pub fn write_dump(&self, out: &mut impl Write) -> io::Result<()> {
        const RULE: &str = "==============================================";

        writeln!(out, "{RULE}")?;
        writeln!(out, "Mesh '{}'", self.name)?;
        for (i, p) in self.positions.iter().enumerate() {
            writeln!(out, "Vertex {}: {:.6} {:.6} {:.6}", i + 1, p.x, p.y, p.z)?;
        }
        writeln!(out, "{RULE}")?;
        for (i, n) in self.normals.iter().enumerate() {
            writeln!(out, "Normal {}: {:.6} {:.6} {:.6}", i + 1, n.x, n.y, n.z)?;
        }
        writeln!(out, "{RULE}")?;
        for (i, t) in self.texcoords.iter().enumerate() {
            writeln!(out, "TexCoord {}: {:.6} {:.6}", i + 1, t.u, t.v)?;
        }
        writeln!(out, "{RULE}")?;
        for (i, face) in self.faces.iter().enumerate() {
            match face.material.and_then(|m| self.materials.get(m)) {
                Some(mat) => writeln!(out, "Face {}: {} [{}]", i + 1, face, mat.name)?,
                None => writeln!(out, "Face {}: {}", i + 1, face)?,
            }
        }
        writeln!(out, "{RULE}")?;
        for m in &self.materials {
            writeln!(
                out,
                "Material '{}': Kd {:?} d {} Ns {} illum {} texture {:?}",
                m.name,
                m.diffuse,
                m.alpha,
                m.ns,
                m.illum.id(),
                m.texture_path
            )?;
        }
        Ok(())
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        let leaked = self.gpu_handles().count();
        if leaked > 0 {
            log::warn!(
                "Mesh '{}' dropped with {} unreleased GPU handle(s)",
                self.name,
                leaked
            );
        }
    }
}

/// Release each handle, continuing past failures.
pub(crate) fn release_all(
    handles: impl IntoIterator<Item = GpuHandle>,
    gpu: &mut dyn GpuResources,
) -> CoreResult<()> {
    let mut first_err = None;
    for handle in handles {
        if let Err(e) = gpu.release(handle) {
            log::warn!("Failed to release {handle}: {e}");
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

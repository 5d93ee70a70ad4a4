//! OBJ parser producing a [`Mesh`]: positions, normals, texture coordinates,
//! faces and their materials.
//!
//! Records are dispatched on their first token. Anything unrecognised,
//! comments included, skips the rest of its line.

use std::{io::BufRead, path::Path};

use corelib::vec3;

use crate::{
    error::AssetResult,
    face::{IndexCounts, parse_face},
    gpu::LoadContext,
    material::load_material_library,
    mesh::{Mesh, TexCoord},
    reader::TokenReader,
};

/// Load an OBJ mesh from a file path. `mtllib` paths are resolved against
/// the directory containing `path`.
pub fn load_mesh(path: impl AsRef<Path>, ctx: &mut LoadContext<'_>) -> AssetResult<Mesh> {
    let path = path.as_ref();
    let mut reader = TokenReader::open(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base_dir = path.parent().unwrap_or(Path::new(""));

    let mut mesh = parse_obj(&mut reader, base_dir, name, ctx)?;
    mesh.path = Some(path.to_path_buf());

    log::info!(
        "Loaded OBJ {:?}: {} positions, {} normals, {} texcoords, {} faces, {} materials",
        path,
        mesh.positions.len(),
        mesh.normals.len(),
        mesh.texcoords.len(),
        mesh.faces.len(),
        mesh.materials.len()
    );
    Ok(mesh)
}

/// Load an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(
    reader: R,
    base_dir: &Path,
    name: &str,
    ctx: &mut LoadContext<'_>,
) -> AssetResult<Mesh> {
    let mut reader = TokenReader::new(reader, base_dir.join(name));
    parse_obj(&mut reader, base_dir, name.to_owned(), ctx)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str, ctx: &mut LoadContext<'_>) -> AssetResult<Mesh> {
    parse_obj(
        &mut TokenReader::from_text(contents),
        Path::new(""),
        String::new(),
        ctx,
    )
}

fn parse_obj<R: BufRead>(
    reader: &mut TokenReader<R>,
    base_dir: &Path,
    name: String,
    ctx: &mut LoadContext<'_>,
) -> AssetResult<Mesh> {
    let mut parser = ObjParser {
        mesh: Mesh::new(name),
        current_material: None,
        base_dir,
    };

    match parser.run(reader, ctx) {
        Ok(()) => {
            parser.drop_dangling_faces(reader.path());
            Ok(parser.mesh)
        }
        Err(e) => {
            // Textures from libraries read before the failure.
            if let Err(release_err) = parser.mesh.release(ctx.gpu) {
                log::warn!("Cleanup after failed load: {release_err}");
            }
            Err(e)
        }
    }
}

struct ObjParser<'a> {
    mesh: Mesh,
    current_material: Option<usize>,
    base_dir: &'a Path,
}

impl ObjParser<'_> {
    fn run<R: BufRead>(
        &mut self,
        reader: &mut TokenReader<R>,
        ctx: &mut LoadContext<'_>,
    ) -> AssetResult<()> {
        while let Some(keyword) = reader.next_token()? {
            match keyword.as_str() {
                "v" => {
                    let [x, y, z] = reader.read_floats()?;
                    self.mesh.positions.push(vec3(x, y, z));
                }
                "vn" => {
                    let [x, y, z] = reader.read_floats()?;
                    self.mesh.normals.push(vec3(x, y, z));
                    self.mesh.has_normals = true;
                }
                "vt" => {
                    let [u, v] = reader.read_floats()?;
                    self.mesh.texcoords.push(TexCoord::from_obj(u, v));
                    self.mesh.has_texcoords = true;
                }
                "usemtl" => {
                    let name = reader.next_line()?.unwrap_or_default();
                    self.use_material(name.trim(), reader);
                }
                "mtllib" => {
                    let line = reader.next_line()?.unwrap_or_default();
                    for file in line.split_whitespace() {
                        self.include_library(file, ctx);
                    }
                    self.mesh.has_materials = true;
                }
                "f" => {
                    let line = reader.next_line()?.unwrap_or_default();
                    match parse_face(&line, self.counts()) {
                        Some(mut face) => {
                            face.material = self.current_material;
                            self.mesh.faces.push(face);
                        }
                        None => log::debug!(
                            "{}:{}: skipping malformed face '{}'",
                            reader.path().display(),
                            reader.line_number(),
                            line.trim()
                        ),
                    }
                }
                _ => reader.skip_line(),
            }
        }
        Ok(())
    }

    fn counts(&self) -> IndexCounts {
        IndexCounts {
            positions: self.mesh.positions.len(),
            texcoords: self.mesh.texcoords.len(),
            normals: self.mesh.normals.len(),
        }
    }

    fn use_material<R: BufRead>(&mut self, name: &str, reader: &TokenReader<R>) {
        match self.mesh.find_material(name) {
            Some(index) => self.current_material = Some(index),
            None => log::warn!(
                "{}:{}: usemtl '{}' names no loaded material; keeping the previous one",
                reader.path().display(),
                reader.line_number(),
                name
            ),
        }
    }

    fn include_library(&mut self, file: &str, ctx: &mut LoadContext<'_>) {
        let path = self.base_dir.join(file);
        match load_material_library(&path, &mut self.mesh, ctx) {
            Ok(()) => {}
            Err(e) if e.is_open_failure() => {
                log::warn!("Material library unavailable, continuing without it: {e}")
            }
            Err(e) => log::warn!("Material library read partially, keeping what loaded: {e}"),
        }
    }

    /// Faces may only reference records that exist once the whole file is read.
    fn drop_dangling_faces(&mut self, source: &Path) {
        let positions = self.mesh.positions.len();
        let texcoords = self.mesh.texcoords.len();
        let normals = self.mesh.normals.len();

        let before = self.mesh.faces.len();
        self.mesh.faces.retain(|face| {
            face.position_indices().iter().all(|&i| i as usize <= positions)
                && face.texcoord_indices().iter().all(|&i| i as usize <= texcoords)
                && face.normal as usize <= normals
        });

        let dropped = before - self.mesh.faces.len();
        if dropped > 0 {
            log::warn!(
                "{}: dropped {} face(s) referencing missing vertices",
                source.display(),
                dropped
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{self, BufReader, Read},
    };

    use super::*;
    use crate::{
        error::AssetError,
        face::FaceSyntax,
        testing::{CountingGpu, StubDecoder},
    };

    fn parse(src: &str) -> Mesh {
        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);
        load_obj_from_str(src, &mut ctx).expect("parse OBJ")
    }

    #[test]
    fn record_counts_follow_file_order() {
        let src = r#"
            # cube corner
            o Corner
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            vn 0.0 0.0 1.0
            v 0.0 1.0 0.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            s off
            f 1/1/1 2/2/1 3/3/1
        "#;
        let mesh = parse(src);
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.normals.len(), 1);
        assert_eq!(mesh.texcoords.len(), 3);
        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(mesh.positions[2], vec3(0.0, 1.0, 0.0));
        assert!(mesh.has_normals && mesh.has_texcoords && !mesh.has_materials);
        assert!(mesh.is_valid());
    }

    #[test]
    fn comment_words_are_not_records() {
        let mesh = parse("# v 9 9 9\nv 1 2 3\n# f 1 1 1\n");
        assert_eq!(mesh.positions, vec![vec3(1.0, 2.0, 3.0)]);
        assert!(mesh.faces.is_empty());
    }

    #[test]
    fn texcoord_v_is_flipped() {
        let mesh = parse("vt 0.0 0.25\n");
        assert_eq!(mesh.texcoords[0].u, 0.0);
        assert!((mesh.texcoords[0].v - 0.75).abs() < 1e-6);
    }

    #[test]
    fn four_groups_make_a_quad() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\nf 1 2 3\n");
        assert!(mesh.faces[0].is_quad);
        assert_eq!(mesh.faces[0].positions, [1, 2, 3, 4]);
        assert!(!mesh.faces[1].is_quad);
        assert_eq!(mesh.faces[1].positions[3], 0);
    }

    #[test]
    fn position_normal_face_shares_last_normal() {
        let mut src = String::new();
        for _ in 0..5 {
            src.push_str("v 0 0 0\n");
        }
        for _ in 0..6 {
            src.push_str("vn 0 0 1\n");
        }
        src.push_str("f 1//2 3//4 5//6\n");
        let mesh = parse(&src);
        let face = &mesh.faces[0];
        assert_eq!(face.syntax, FaceSyntax::PositionNormal);
        assert_eq!(face.texcoords, [0; 4]);
        assert_eq!(face.positions, [1, 3, 5, 0]);
        assert_eq!(face.normal, 6);
    }

    #[test]
    fn short_vertex_is_zero_filled() {
        let mesh = parse("v 1 2\nv 4 5 6\n");
        assert_eq!(mesh.positions, vec![vec3(1.0, 2.0, 0.0), vec3(4.0, 5.0, 6.0)]);
    }

    #[test]
    fn malformed_and_dangling_faces_are_dropped() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2\nf a b c\nf 1 2 9\nf 1 2 3\n");
        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(mesh.faces[0].positions, [1, 2, 3, 0]);
    }

    #[test]
    fn usemtl_tracks_materials_and_ignores_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.mtl"),
            "newmtl Foo\nKd 1 0 0\nnewmtl Bar\nKd 0 1 0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("model.obj"),
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             usemtl Foo\nf 1 2 3\n\
             mtllib lib.mtl\n\
             usemtl Bar\nf 1 2 3\n\
             usemtl Nope\nf 1 2 3\n\
             usemtl Foo\nf 1 2 3\n",
        )
        .unwrap();

        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);
        let mesh = load_mesh(dir.path().join("model.obj"), &mut ctx).unwrap();

        let cursors: Vec<_> = mesh.faces.iter().map(|f| f.material).collect();
        // `usemtl Foo` before the library is loaded leaves the cursor unset.
        assert_eq!(cursors, [None, Some(1), Some(1), Some(0)]);
        assert!(mesh.has_materials);
        assert_eq!(mesh.name, "model");
        assert_eq!(mesh.path.as_deref(), Some(dir.path().join("model.obj").as_path()));
    }

    #[test]
    fn mtllib_resolves_relative_to_obj_directory() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        fs::create_dir_all(models.join("textures")).unwrap();
        fs::write(models.join("textures/skin.png"), b"stub").unwrap();
        fs::write(
            models.join("textures/skin.mtl"),
            "newmtl Skin\nmap_Kd skin.png\n",
        )
        .unwrap();
        fs::write(
            models.join("body.obj"),
            "mtllib textures/skin.mtl\nusemtl Skin\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .unwrap();

        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mesh = {
            let mut ctx = LoadContext::new(&mut gpu, &images);
            load_mesh(models.join("body.obj"), &mut ctx).unwrap()
        };
        assert_eq!(mesh.materials.len(), 1);
        assert!(mesh.materials[0].texture().is_some());
        assert_eq!(mesh.faces[0].material, Some(0));
        mesh.release(&mut gpu).unwrap();
        assert!(gpu.live.is_empty());
    }

    #[test]
    fn missing_library_still_marks_materials() {
        let mesh = parse("mtllib absent.mtl\nv 0 0 0\n");
        assert!(mesh.has_materials);
        assert!(mesh.materials.is_empty());
        assert_eq!(mesh.positions.len(), 1);
    }

    #[test]
    fn unreadable_library_does_not_stop_the_mesh() {
        let dir = tempfile::tempdir().unwrap();
        // Opens on Unix, then fails on the first read.
        fs::create_dir(dir.path().join("dir.mtl")).unwrap();
        fs::write(
            dir.path().join("m.obj"),
            "mtllib dir.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .unwrap();

        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);
        let mesh = load_mesh(dir.path().join("m.obj"), &mut ctx).unwrap();
        assert!(mesh.has_materials);
        assert!(mesh.materials.is_empty());
        assert_eq!(mesh.faces.len(), 1);
    }

    #[test]
    fn missing_obj_is_an_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);
        let err = load_mesh(dir.path().join("nope.obj"), &mut ctx).unwrap_err();
        assert!(matches!(err, AssetError::NotFound { .. }));
    }

    /// Yields `prefix`, then fails every read.
    struct BrokenAfter<'a>(&'a [u8]);

    impl Read for BrokenAfter<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Err(io::Error::other("disk on fire"));
            }
            let n = buf.len().min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_failure_releases_uploaded_textures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.png"), b"stub").unwrap();
        fs::write(dir.path().join("m.mtl"), "newmtl M\nmap_Kd t.png\n").unwrap();

        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let err = {
            let mut ctx = LoadContext::new(&mut gpu, &images);
            let reader = BufReader::new(BrokenAfter(b"mtllib m.mtl\nv 0 0 0\n"));
            load_obj_from_reader(reader, dir.path(), "broken.obj", &mut ctx).unwrap_err()
        };
        assert!(matches!(err, AssetError::Read { line: 3, .. }));
        assert_eq!(gpu.uploads, 1);
        assert!(gpu.live.is_empty());
        assert!(gpu.each_released_once());
    }
}

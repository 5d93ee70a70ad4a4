//! Animation sequences: one OBJ file per frame, ordered by path.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use corelib::CoreResult;
use thiserror::Error;

use crate::{
    error::{AssetError, AssetResult},
    gpu::{GpuResources, LoadContext},
    mesh::Mesh,
    obj::load_mesh,
};

/// Substring a directory entry must contain to count as a frame.
pub const MODEL_EXTENSION: &str = ".obj";

/// Direction of the lexicographic path sort that numbers frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown frame order '{0}' (expected asc or desc)")]
pub struct ParseFrameOrderError(String);

impl FromStr for FrameOrder {
    type Err = ParseFrameOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(FrameOrder::Ascending),
            "desc" | "descending" => Ok(FrameOrder::Descending),
            _ => Err(ParseFrameOrderError(s.to_owned())),
        }
    }
}

/// Meshes indexed by frame number. Each frame is owned independently.
#[derive(Debug, Default)]
pub struct AnimationSequence {
    frames: Vec<Mesh>,
}

impl AnimationSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&Mesh> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mesh> {
        self.frames.iter()
    }

    /// Compile every frame through the GPU collaborator.
    pub fn compile(&mut self, gpu: &mut dyn GpuResources) -> CoreResult<()> {
        for mesh in &mut self.frames {
            mesh.compile(gpu)?;
        }
        Ok(())
    }

    /// Release every frame. All frames are attempted; the first error is returned.
    pub fn release(self, gpu: &mut dyn GpuResources) -> CoreResult<()> {
        let mut first_err = None;
        for mesh in self.frames {
            if let Err(e) = mesh.release(gpu) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<'a> IntoIterator for &'a AnimationSequence {
    type Item = &'a Mesh;
    type IntoIter = std::slice::Iter<'a, Mesh>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Paths of the frame files in `dir`, in frame order.
///
/// An entry qualifies when its name contains both [`MODEL_EXTENSION`] and
/// `filter`. Paths are compared byte-wise, so `frame_10` sorts before `frame_2`.
pub fn scan_frames(dir: &Path, filter: &str, order: FrameOrder) -> AssetResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| AssetError::open(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.contains(MODEL_EXTENSION) && name.contains(filter) {
            paths.push(entry.path());
        }
    }

    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    if order == FrameOrder::Descending {
        paths.reverse();
    }
    Ok(paths)
}

/// Load every matching OBJ in `dir` as one frame.
///
/// Frames that fail to load are skipped with a warning. No matches yields an
/// empty sequence; only an unreadable directory is an error.
pub fn load_animation(
    dir: impl AsRef<Path>,
    filter: &str,
    order: FrameOrder,
    ctx: &mut LoadContext<'_>,
) -> AssetResult<AnimationSequence> {
    let dir = dir.as_ref();
    let paths = scan_frames(dir, filter, order)?;

    let mut frames = Vec::with_capacity(paths.len());
    for path in &paths {
        match load_mesh(path, ctx) {
            Ok(mesh) => frames.push(mesh),
            Err(e) => log::warn!("Skipping frame {:?}: {}", path, e),
        }
    }

    log::info!(
        "Loaded {} of {} frame(s) from {:?} (filter '{}', {:?})",
        frames.len(),
        paths.len(),
        dir,
        filter,
        order
    );
    Ok(AnimationSequence { frames })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::testing::{CountingGpu, StubDecoder};

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn frame_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), TRIANGLE).unwrap();
        }
        dir
    }

    fn names(seq: &AnimationSequence) -> Vec<&str> {
        seq.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn frames_sort_lexically_not_numerically() {
        let dir = frame_dir(&[
            "frame_2.obj",
            "frame_10.obj",
            "frame_1.obj",
            "idle.obj",
            "frame_notes.txt",
        ]);
        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);

        let seq = load_animation(dir.path(), "frame", FrameOrder::Ascending, &mut ctx).unwrap();
        assert_eq!(names(&seq), ["frame_1", "frame_10", "frame_2"]);
        assert_eq!(seq.frame(1).unwrap().name, "frame_10");

        let seq = load_animation(dir.path(), "frame", FrameOrder::Descending, &mut ctx).unwrap();
        assert_eq!(names(&seq), ["frame_2", "frame_10", "frame_1"]);
    }

    #[test]
    fn scan_joins_directory_and_name() {
        let dir = frame_dir(&["walk_b.obj", "walk_a.obj"]);
        let paths = scan_frames(dir.path(), "walk", FrameOrder::Ascending).unwrap();
        assert_eq!(paths, [dir.path().join("walk_a.obj"), dir.path().join("walk_b.obj")]);
    }

    #[test]
    fn no_matches_is_an_empty_sequence() {
        let dir = frame_dir(&["idle.obj"]);
        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);
        let seq = load_animation(dir.path(), "run", FrameOrder::Ascending, &mut ctx).unwrap();
        assert!(seq.is_empty());
        assert_eq!(seq.len(), 0);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);
        let err = load_animation(dir.path().join("gone"), "", FrameOrder::Ascending, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, AssetError::NotFound { .. }));
    }

    #[test]
    fn unreadable_frame_is_skipped() {
        let dir = frame_dir(&["frame_1.obj", "frame_3.obj"]);
        // A directory passes the name filter but cannot be parsed.
        fs::create_dir(dir.path().join("frame_2.obj")).unwrap();

        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);
        let seq = load_animation(dir.path(), "frame", FrameOrder::Ascending, &mut ctx).unwrap();
        assert_eq!(names(&seq), ["frame_1", "frame_3"]);
    }

    #[test]
    fn release_frees_every_frame() {
        let dir = frame_dir(&["a.obj", "b.obj", "c.obj"]);
        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut seq = {
            let mut ctx = LoadContext::new(&mut gpu, &images);
            load_animation(dir.path(), "", FrameOrder::Ascending, &mut ctx).unwrap()
        };
        seq.compile(&mut gpu).unwrap();
        assert_eq!(gpu.compiles, 3);
        assert!(seq.iter().all(|m| m.compiled().is_some()));

        seq.release(&mut gpu).unwrap();
        assert_eq!(gpu.released.len(), 3);
        assert!(gpu.each_released_once());
        assert!(gpu.live.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_frame_names_keep_their_bytes() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let dir = frame_dir(&["frame_a.obj"]);
        let raw = OsStr::from_bytes(b"frame_\xe9.obj");
        fs::write(dir.path().join(raw), TRIANGLE).unwrap();

        let paths = scan_frames(dir.path(), "frame", FrameOrder::Ascending).unwrap();
        assert_eq!(paths, [dir.path().join("frame_a.obj"), dir.path().join(raw)]);
        assert!(paths.iter().all(|p| p.is_file()));

        let mut gpu = CountingGpu::default();
        let images = StubDecoder::default();
        let mut ctx = LoadContext::new(&mut gpu, &images);
        let seq = load_animation(dir.path(), "frame", FrameOrder::Ascending, &mut ctx).unwrap();
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn frame_order_from_str() {
        assert_eq!("asc".parse::<FrameOrder>(), Ok(FrameOrder::Ascending));
        assert_eq!("DESC".parse::<FrameOrder>(), Ok(FrameOrder::Descending));
        assert!("sideways".parse::<FrameOrder>().is_err());
    }
}

//! Load errors shared by the OBJ/MTL readers and the animation sequencer.

use std::{
    io,
    path::{Path, PathBuf},
};

use corelib::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {} at line {line}: {source}", path.display())]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Gpu(#[from] CoreError),
}

impl AssetError {
    /// Classify a failed `open`/`read_dir` call.
    pub(crate) fn open(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => AssetError::NotFound { path },
            io::ErrorKind::PermissionDenied => AssetError::PermissionDenied { path },
            _ => AssetError::Open { path, source: err },
        }
    }

    /// Returns `true` for errors raised before any data was read.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            AssetError::NotFound { .. }
                | AssetError::PermissionDenied { .. }
                | AssetError::Open { .. }
        )
    }
}

pub type AssetResult<T> = Result<T, AssetError>;

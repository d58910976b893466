use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Per-file failures raised by the normalizer, resolver and recovery engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no sidecar found for {}", .file.display())]
    SidecarNotFound { file: PathBuf },

    #[error("unsupported media type: {} (only .jpg, .heic and .mp4 can be dated without a sidecar)", .file.display())]
    UnsupportedMediaType { file: PathBuf },

    #[error("malformed sidecar {}: {reason}", .path.display())]
    MalformedSidecar { path: PathBuf, reason: String },

    #[error("cannot rename {} to {}: target already exists", .from.display(), .to.display())]
    RenameConflict { from: PathBuf, to: PathBuf },

    #[error("no capture time in {}: {reason}", .file.display())]
    NoCaptureTime { file: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the caller should retry with embedded metadata instead.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Error::SidecarNotFound { .. } | Error::MalformedSidecar { .. }
        )
    }
}

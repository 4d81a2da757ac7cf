//! Static file serving

use std::path::{Path, PathBuf};

use tower_http::services::ServeDir;
use tracing::warn;

/// Read-only directory served under `/images/`.
///
/// `ServeDir` refuses paths that escape the root, including
/// percent-encoded `..` segments.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if !root.is_dir() {
            warn!("Static directory {} does not exist", root.display());
        }
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Service for mounting with `Router::nest_service`
    pub fn service(&self) -> ServeDir {
        ServeDir::new(&self.root)
    }
}

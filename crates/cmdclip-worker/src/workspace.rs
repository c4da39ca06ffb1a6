//! Per-job scratch directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::WorkerResult;

/// Scratch directory for one job's intermediate files.
///
/// Backed by a `TempDir` under the configured work directory, so the whole
/// tree is removed when the workspace is dropped, including on panic
/// unwind.
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a workspace for `job_id` under `work_dir`.
    pub fn create(work_dir: &str, job_id: &str) -> WorkerResult<Self> {
        std::fs::create_dir_all(work_dir)?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{job_id}-"))
            .tempdir_in(work_dir)?;

        debug!(job_id, path = %dir.path().display(), "Created job workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().to_string_lossy().into_owned();

        let path = {
            let ws = JobWorkspace::create(&work_dir, "clip").unwrap();
            std::fs::write(ws.file("raw.mp4"), b"data").unwrap();
            ws.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_removed_on_panic() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().to_string_lossy().into_owned();

        let path = std::sync::Mutex::new(None);
        let result = std::panic::catch_unwind(|| {
            let ws = JobWorkspace::create(&work_dir, "clip").unwrap();
            *path.lock().unwrap() = Some(ws.path().to_path_buf());
            panic!("stage blew up");
        });

        assert!(result.is_err());
        let path = path.lock().unwrap().take().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_path_is_under_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().to_string_lossy().into_owned();

        let ws = JobWorkspace::create(&work_dir, "clip").unwrap();
        assert!(ws.path().starts_with(root.path()));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("clip-"));
    }
}

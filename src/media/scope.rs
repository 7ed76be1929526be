use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A uniquely named temporary directory owned by a single pipeline run.
///
/// The directory and everything below it is removed when the scope is closed or
/// dropped, whichever happens first.
#[derive(Debug)]
pub struct ResourceScope {
    dir: TempDir,
}

impl ResourceScope {
    /// Create a scope named after `label` under `root` (the system temp dir when `None`)
    pub fn create(label: &str, root: Option<&Path>) -> std::io::Result<Self> {
        let prefix = format!("tubeframes_{}_", crate::utils::sanitize_filename(label));
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match root {
            Some(root) => {
                fs_err::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        tracing::debug!("Created resource scope {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of an entry inside the scope
    pub fn child(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Create a sub-directory inside the scope
    pub fn create_subdir(&self, name: &str) -> std::io::Result<PathBuf> {
        let path = self.child(name);
        fs_err::create_dir_all(&path)?;
        Ok(path)
    }

    /// Remove the scope now, logging instead of failing if removal goes wrong
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!("Removed resource scope {}", path.display()),
            Err(e) => tracing::warn!("Failed to remove resource scope {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_removes_directory_and_contents() {
        let root = TempDir::new().unwrap();
        let path = {
            let scope = ResourceScope::create("abc", Some(root.path())).unwrap();
            let frames = scope.create_subdir("frames").unwrap();
            fs_err::write(frames.join("frame_0001.jpg"), b"jpg").unwrap();
            scope.path().to_path_buf()
        };

        assert!(!path.exists());
        assert_eq!(fs_err::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_close_removes_directory() {
        let root = TempDir::new().unwrap();
        let scope = ResourceScope::create("abc", Some(root.path())).unwrap();
        let path = scope.path().to_path_buf();
        fs_err::write(scope.child("partial.mp4.part"), b"partial").unwrap();

        scope.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_scopes_are_unique_per_run() {
        let root = TempDir::new().unwrap();
        let a = ResourceScope::create("same", Some(root.path())).unwrap();
        let b = ResourceScope::create("same", Some(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("tubeframes_same_"));
    }
}

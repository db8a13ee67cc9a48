use super::{DirEntry, FileSystem, FileType};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for RealFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context(format!("Failed to read file {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let entries = fs::read_dir(path).context(format!("Failed to read directory {:?}", path))?;

        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            // Bindings are commonly mounted through symlinks, so follow them.
            let file_type = if path.is_file() {
                FileType::File
            } else if path.is_dir() {
                FileType::Directory
            } else {
                FileType::Other
            };

            result.push(DirEntry {
                path,
                name,
                file_type,
            });
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        path.canonicalize()
            .context(format!("Failed to canonicalize path {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_app_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path();

        fs::create_dir(base.join("public")).unwrap();
        fs::write(base.join("nginx.conf"), "worker_processes 1;").unwrap();
        fs::write(base.join("public/index.html"), "<body>Hello World!</body>").unwrap();

        dir
    }

    #[test]
    fn test_exists_and_kinds() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        assert!(!fs.is_file(&temp.path().join("httpd.conf")));
        assert!(fs.is_dir(&temp.path().join("public")));
        assert!(fs.is_file(&temp.path().join("nginx.conf")));
        assert!(!fs.is_file(&temp.path().join("public")));
    }

    #[test]
    fn test_read_to_string() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        let content = fs.read_to_string(&temp.path().join("nginx.conf")).unwrap();
        assert_eq!(content, "worker_processes 1;");
        assert!(fs.read_to_string(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_read_dir_is_sorted() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        let entries = fs.read_dir(temp.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name()).collect();

        assert_eq!(names, vec!["nginx.conf", "public"]);
        assert!(entries[1].is_dir());
    }

    #[test]
    fn test_canonicalize() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        let canonical = fs.canonicalize(temp.path()).unwrap();
        assert!(canonical.is_absolute());
    }
}

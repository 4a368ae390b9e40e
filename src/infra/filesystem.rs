//! Filesystem operations
//!
//! Handles file and directory operations.

use std::path::Path;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::Remove {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Remove a file if it exists
///
/// Returns whether anything was removed.
pub fn remove_file(path: &Path) -> Result<bool, FilesystemError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FilesystemError::Remove {
            path: path.to_path_buf(),
            error: e.to_string(),
        }),
    }
}

/// Copy a file, replacing the destination
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| FilesystemError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        })
}

/// Add execute permission for everyone (`chmod +x`)
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<(), FilesystemError> {
    use std::os::unix::fs::PermissionsExt;

    let to_error = |e: std::io::Error| FilesystemError::Permissions {
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    let mut permissions = std::fs::metadata(path).map_err(to_error)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions).map_err(to_error)
}

/// Add execute permission for everyone (`chmod +x`)
#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<(), FilesystemError> {
    Ok(())
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_file_reports_absence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("magick.wasm");

        assert!(!remove_file(&path).unwrap());
        std::fs::write(&path, b"\0asm").unwrap();
        assert!(remove_file(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/logs/zlib.log");

        write_file(&path, "ok").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "ok");
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("configure");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        make_executable(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_remove_dir_all_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(remove_dir_all(&temp.path().join("out")).is_ok());
    }
}

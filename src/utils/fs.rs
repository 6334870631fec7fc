//! File writing helpers shared by the cache and the writer.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Check if the file at `path` already holds exactly `content`.
pub fn file_content_matches(path: &Path, content: &[u8]) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() == content.len() as u64 => {
            fs::read(path).is_ok_and(|existing| existing == content)
        }
        _ => false,
    }
}

/// Write `content` to `path` via a sibling temp file and a rename.
///
/// Readers never observe a partially written file, and concurrent writers
/// of the same path end with one complete version (last rename wins). The
/// temp file is removed when any step fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    // NamedTempFile is created 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.js");

        write_atomic(&path, b"one").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"one");

        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");

        // No temp files left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.css");
        write_atomic(&path, b"a{}").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_write_atomic_failure_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("taken")).unwrap();
        // Renaming a file over a directory fails
        assert!(write_atomic(&dir.path().join("taken"), b"x").is_err());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_atomic_missing_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing/out.js");
        assert!(write_atomic(&path, b"x").is_err());
    }

    #[test]
    fn test_file_content_matches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        assert!(!file_content_matches(&path, b"abc"));

        fs::write(&path, b"abc").unwrap();
        assert!(file_content_matches(&path, b"abc"));
        assert!(!file_content_matches(&path, b"abd"));
        assert!(!file_content_matches(&path, b"abcd"));
    }
}

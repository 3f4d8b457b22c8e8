//! The handful of filesystem operations the plugins need, behind a trait so that tests can swap
//! the real filesystem for an in-memory one.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tempfile::Builder;

/// Filesystem operations used while setting up a plugin.
pub trait Filesystem: fmt::Debug + Send + Sync {
    /// Returns `true` if anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Create a new, empty file in `dir` whose name starts with `prefix` and ends in a random
    /// suffix. The file is left in place; the caller owns it from here on.
    fn create_temp(&self, dir: &Path, prefix: &str) -> io::Result<PathBuf>;

    /// Replace the contents of the file at `path`.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Set the unix permission bits of the file at `path`.
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Remove the file at `path`.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// The filesystem of the machine the plugin runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_temp(&self, dir: &Path, prefix: &str) -> io::Result<PathBuf> {
        let (_file, path) = Builder::new()
            .prefix(prefix)
            .tempfile_in(dir)?
            .keep()
            .map_err(|e| e.error)?;
        Ok(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, path: &Path, _mode: u32) -> io::Result<()> {
        // no mode bits to speak of, but the file should at least be there
        fs::metadata(path).map(|_| ())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    mode: u32,
}

/// An in-memory [`Filesystem`].
///
/// Directories are implicit: creating a file anywhere always succeeds.
#[derive(Debug, Default)]
pub struct MemoryFilesystem {
    files: Mutex<BTreeMap<PathBuf, MemoryFile>>,
    counter: AtomicU64,
}

impl MemoryFilesystem {
    /// The mode newly created files start out with.
    pub const DEFAULT_MODE: u32 = 0o644;

    /// An empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// A filesystem holding an empty file at each of `paths`.
    pub fn with_files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let fs = Self::new();
        for path in paths {
            fs.touch(path);
        }
        fs
    }

    /// Create an empty file at `path`, truncating it if it already exists.
    pub fn touch(&self, path: impl AsRef<Path>) {
        self.lock().insert(
            path.as_ref().to_path_buf(),
            MemoryFile {
                contents: Vec::new(),
                mode: Self::DEFAULT_MODE,
            },
        );
    }

    /// The contents of the file at `path`, if there is one.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().get(path.as_ref()).map(|f| f.contents.clone())
    }

    /// The permission bits of the file at `path`, if there is one.
    pub fn mode(&self, path: impl AsRef<Path>) -> Option<u32> {
        self.lock().get(path.as_ref()).map(|f| f.mode)
    }

    /// All paths currently in the filesystem, in sorted order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, MemoryFile>> {
        // a panic while holding the lock cannot leave the map half-updated
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_file<T>(&self, path: &Path, f: impl FnOnce(&mut MemoryFile) -> T) -> io::Result<T> {
        match self.lock().get_mut(path) {
            Some(file) => Ok(f(file)),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such file", path.display()),
            )),
        }
    }
}

impl Filesystem for MemoryFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn create_temp(&self, dir: &Path, prefix: &str) -> io::Result<PathBuf> {
        loop {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            let path = dir.join(format!("{}{:06}", prefix, n));

            let mut files = self.lock();
            if files.contains_key(&path) {
                continue;
            }
            files.insert(
                path.clone(),
                MemoryFile {
                    contents: Vec::new(),
                    mode: Self::DEFAULT_MODE,
                },
            );
            return Ok(path);
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.with_file(path, |file| file.contents = contents.to_vec())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.with_file(path, |file| file.mode = mode)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.lock().remove(path).map(|_| ()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such file", path.display()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_filesystem() {
        let fs = MemoryFilesystem::with_files(["/usr/bin/ssh"]);
        assert!(fs.exists(Path::new("/usr/bin/ssh")));
        assert!(!fs.exists(Path::new("/usr/bin/scp")));

        let a = fs.create_temp(Path::new("/tmp/"), "prefix-").unwrap();
        let b = fs.create_temp(Path::new("/tmp/"), "prefix-").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("/tmp"));
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("prefix-"));

        fs.write(&a, b"hello").unwrap();
        fs.set_mode(&a, 0o600).unwrap();
        assert_eq!(fs.read(&a).unwrap(), b"hello");
        assert_eq!(fs.mode(&a), Some(0o600));
        assert_eq!(fs.mode(&b), Some(MemoryFilesystem::DEFAULT_MODE));

        fs.remove(&a).unwrap();
        assert!(!fs.exists(&a));
        assert_eq!(
            fs.remove(&a).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            fs.write(&a, b"gone").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn os_filesystem_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFilesystem;

        let path = fs.create_temp(dir.path(), "vela-test-").unwrap();
        assert!(fs.exists(&path));
        assert_eq!(path.parent(), Some(dir.path()));

        fs.write(&path, b"contents").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"contents");

        fs.remove(&path).unwrap();
        assert!(!fs.exists(&path));
    }
}

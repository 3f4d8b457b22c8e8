//! Staging of secrets into files that `ssh`, `scp` and `sshpass` can read.

use std::path::{Path, PathBuf};

use super::fs::Filesystem;
use super::Error;

/// Where staged secrets are placed.
pub const TEMP_FILE_DIRECTORY: &str = "/tmp/";

/// Name prefix of a staged identity file.
pub const IDENTITY_FILE_PREFIX: &str = "vela-plugin-openssh-identity-file-";

/// Name prefix of a staged passphrase file.
pub const PASSPHRASE_PREFIX: &str = "vela-plugin-openssh-passphrase-file-";

/// Name prefix of a staged password file.
pub const PASSWORD_PREFIX: &str = "vela-plugin-openssh-password-file-";

/// Read-write for the owner only; `ssh` refuses identity files that are any more open.
pub const FILE_MODE: u32 = 0o600;

/// Write `contents` to a fresh file in [`TEMP_FILE_DIRECTORY`] named `prefix` plus a random
/// suffix, restrict it to [`FILE_MODE`] and return its path.
///
/// If the file was created but could not be filled or restricted, it is removed again before the
/// error is returned.
pub fn stage(fs: &dyn Filesystem, prefix: &str, contents: &str) -> Result<PathBuf, Error> {
    let path = fs
        .create_temp(Path::new(TEMP_FILE_DIRECTORY), prefix)
        .map_err(Error::StageCreate)?;

    let finish = fs
        .write(&path, contents.as_bytes())
        .map_err(Error::StageWrite)
        .and_then(|()| {
            fs.set_mode(&path, FILE_MODE)
                .map_err(Error::StagePermissions)
        });

    if let Err(e) = finish {
        if let Err(cleanup) = fs.remove(&path) {
            tracing::warn!(
                path = %path.display(),
                error = %cleanup,
                "couldn't remove partially staged file"
            );
        }
        return Err(e);
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFilesystem;
    use std::io;

    #[derive(Debug, Default)]
    struct BrokenFilesystem {
        inner: MemoryFilesystem,
        fail_create: bool,
        fail_write: bool,
        fail_mode: bool,
    }

    fn broken() -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, "broken")
    }

    impl Filesystem for BrokenFilesystem {
        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }

        fn create_temp(&self, dir: &Path, prefix: &str) -> io::Result<PathBuf> {
            if self.fail_create {
                return Err(broken());
            }
            self.inner.create_temp(dir, prefix)
        }

        fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
            if self.fail_write {
                return Err(broken());
            }
            self.inner.write(path, contents)
        }

        fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
            if self.fail_mode {
                return Err(broken());
            }
            self.inner.set_mode(path, mode)
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            self.inner.remove(path)
        }
    }

    #[test]
    fn stages_restricted_file() {
        let fs = MemoryFilesystem::new();
        let path = stage(&fs, PASSWORD_PREFIX, "hunter2").unwrap();

        assert!(path.starts_with(TEMP_FILE_DIRECTORY));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(PASSWORD_PREFIX));
        assert_eq!(fs.read(&path).unwrap(), b"hunter2");
        assert_eq!(fs.mode(&path), Some(FILE_MODE));
    }

    #[test]
    fn every_stage_gets_its_own_file() {
        let fs = MemoryFilesystem::new();
        let a = stage(&fs, IDENTITY_FILE_PREFIX, "a").unwrap();
        let b = stage(&fs, IDENTITY_FILE_PREFIX, "b").unwrap();
        assert_ne!(a, b);
        assert_eq!(fs.read(&a).unwrap(), b"a");
        assert_eq!(fs.read(&b).unwrap(), b"b");
    }

    #[test]
    fn create_failure() {
        let fs = BrokenFilesystem {
            fail_create: true,
            ..Default::default()
        };
        let err = stage(&fs, PASSWORD_PREFIX, "hunter2").unwrap_err();
        assert!(matches!(err, Error::StageCreate(_)), "{:?}", err);
        assert!(fs.inner.paths().is_empty());
    }

    #[test]
    fn write_failure_cleans_up() {
        let fs = BrokenFilesystem {
            fail_write: true,
            ..Default::default()
        };
        let err = stage(&fs, PASSWORD_PREFIX, "hunter2").unwrap_err();
        assert!(matches!(err, Error::StageWrite(_)), "{:?}", err);
        assert!(fs.inner.paths().is_empty());
    }

    #[test]
    fn permission_failure_cleans_up() {
        let fs = BrokenFilesystem {
            fail_mode: true,
            ..Default::default()
        };
        let err = stage(&fs, PASSPHRASE_PREFIX, "correct horse").unwrap_err();
        assert!(matches!(err, Error::StagePermissions(_)), "{:?}", err);
        assert!(fs.inner.paths().is_empty());
    }
}

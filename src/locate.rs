//! Finding the binaries the plugins wrap.

use std::fmt;
use std::path::{Path, PathBuf};

use super::fs::Filesystem;
use super::Error;

/// Directories searched for the wrapped binaries, in order.
///
/// `PATH` is not consulted.
pub const BIN_SEARCH_LOCATIONS: &[&str] = &[".", "/usr/local/bin", "/usr/bin", "/bin"];

/// A binary the plugins wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tool {
    /// The OpenSSH secure copy client.
    Scp,
    /// The OpenSSH remote login client.
    Ssh,
    /// The non-interactive password provider.
    Sshpass,
}

impl Tool {
    /// The file name of the binary.
    pub fn name(self) -> &'static str {
        match self {
            Tool::Scp => "scp",
            Tool::Ssh => "ssh",
            Tool::Sshpass => "sshpass",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Find `tool` in the first of `dirs` that contains it.
pub fn locate<D>(fs: &dyn Filesystem, dirs: &[D], tool: Tool) -> Result<PathBuf, Error>
where
    D: AsRef<Path>,
{
    dirs.iter()
        .map(|dir| dir.as_ref().join(tool.name()))
        .find(|candidate| fs.exists(candidate))
        .ok_or(Error::MissingTool(tool))
}

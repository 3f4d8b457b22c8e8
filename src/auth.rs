//! Authentication material shared by both plugins, and the `sshpass` plumbing that goes with it.

use std::fmt;
use std::path::{Path, PathBuf};

use super::fs::Filesystem;
use super::secret::{self, IDENTITY_FILE_PREFIX, PASSPHRASE_PREFIX, PASSWORD_PREFIX};
use super::Error;

/// Flags passed to `sshpass` when none are given.
pub const DEFAULT_SSHPASS_FLAGS: &[&str] = &[];

/// Flags passed to `ssh` (and `scp`) when none are given.
///
/// Host keys are neither checked nor remembered, since a pipeline has nobody around to answer the
/// interactive prompt.
pub const DEFAULT_SSH_FLAGS: &[&str] = &[
    "-o StrictHostKeyChecking=no",
    "-o UserKnownHostsFile=/dev/null",
];

/// `scp` runs over `ssh` and wants the same host key behaviour.
pub const DEFAULT_SCP_FLAGS: &[&str] = DEFAULT_SSH_FLAGS;

/// How a plugin authenticates against remote hosts.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Identity files to try, in order.
    pub identity_file_paths: Vec<String>,

    /// The raw contents of an identity file.
    ///
    /// Secrets usually arrive through environment variables, so this is written out to a
    /// restricted file during setup and tried before any of the
    /// [`identity_file_paths`](Self::identity_file_paths).
    pub identity_file_contents: Option<String>,

    /// Password for the remote host, handed to `sshpass`.
    ///
    /// `sshpass` only takes one secret, so the same password has to work for every host involved.
    pub password: Option<String>,

    /// Passphrase for the identity files, handed to `sshpass`.
    ///
    /// As with [`password`](Self::password), every identity file that has a passphrase must use
    /// this one.
    pub passphrase: Option<String>,

    /// Flags for `sshpass`. Setting any of them enables `sshpass` even without a password.
    pub sshpass_flags: Vec<String>,

    pub(crate) password_file: Option<PathBuf>,
    pub(crate) passphrase_file: Option<PathBuf>,
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    given(value).map(|_| "<redacted>")
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity_file_paths", &self.identity_file_paths)
            .field(
                "identity_file_contents",
                &redact(&self.identity_file_contents),
            )
            .field("password", &redact(&self.password))
            .field("passphrase", &redact(&self.passphrase))
            .field("sshpass_flags", &self.sshpass_flags)
            .field("password_file", &self.password_file)
            .field("passphrase_file", &self.passphrase_file)
            .finish()
    }
}

impl Credentials {
    /// Reject combinations `sshpass` cannot handle.
    pub fn validate(&self) -> Result<(), Error> {
        if given(&self.password).is_some() && given(&self.passphrase).is_some() {
            return Err(Error::AmbiguousAuth);
        }

        Ok(())
    }

    /// Write every secret that needs to live in a file out to one.
    ///
    /// Running this twice stages everything twice.
    pub(crate) fn stage(&mut self, fs: &dyn Filesystem) -> Result<(), Error> {
        if let Some(contents) = given(&self.identity_file_contents) {
            let path = secret::stage(fs, IDENTITY_FILE_PREFIX, contents)?;
            self.identity_file_paths
                .insert(0, path.to_string_lossy().into_owned());
        }

        if let Some(password) = given(&self.password) {
            self.password_file = Some(secret::stage(fs, PASSWORD_PREFIX, password)?);
        }

        if let Some(passphrase) = given(&self.passphrase) {
            self.passphrase_file = Some(secret::stage(fs, PASSPHRASE_PREFIX, passphrase)?);
        }

        Ok(())
    }

    /// Whether the wrapped binary has to be run through `sshpass`.
    pub fn use_sshpass(&self) -> bool {
        !self.sshpass_flags.is_empty()
            || given(&self.password).is_some()
            || given(&self.passphrase).is_some()
    }

    /// Where the password was staged, once set up.
    pub fn password_file(&self) -> Option<&Path> {
        self.password_file.as_deref()
    }

    /// Where the passphrase was staged, once set up.
    pub fn passphrase_file(&self) -> Option<&Path> {
        self.passphrase_file.as_deref()
    }

    /// Start an argument vector that runs `program`, through `sshpass` if need be.
    ///
    /// `sshpass` has to come first, followed by its own flags and the secret file, and only then
    /// the program it wraps.
    pub(crate) fn command_prefix(&self, sshpass: &Path, program: &Path) -> Vec<String> {
        let mut args = Vec::new();

        if self.use_sshpass() {
            args.push(display(sshpass));
            args.extend(flags_or_default(&self.sshpass_flags, DEFAULT_SSHPASS_FLAGS));

            if given(&self.password).is_some() {
                args.push("-f".to_string());
                args.push(display_opt(self.password_file()));
            } else if given(&self.passphrase).is_some() {
                args.push("-Passphrase".to_string());
                args.push("-f".to_string());
                args.push(display_opt(self.passphrase_file()));
            }
        }

        args.push(display(program));
        args
    }

    /// `-i <path>` for every identity file, in order.
    pub(crate) fn identity_args(&self) -> impl Iterator<Item = String> + '_ {
        self.identity_file_paths
            .iter()
            .flat_map(|path| ["-i".to_string(), path.clone()])
    }
}

/// The user's flags, or `defaults` if there are none. The two are never merged.
pub(crate) fn flags_or_default(flags: &[String], defaults: &[&str]) -> Vec<String> {
    if flags.is_empty() {
        defaults.iter().map(|f| f.to_string()).collect()
    } else {
        flags.to_vec()
    }
}

pub(crate) fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn display_opt(path: Option<&Path>) -> String {
    path.map(display).unwrap_or_default()
}

use std::io;
use std::path::PathBuf;

use crate::locate::Tool;

/// Errors that occur while configuring or running a plugin.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The remote-copy plugin has no source to copy.
    #[error("missing source parameter")]
    MissingSource,

    /// The remote-copy plugin has nowhere to copy to.
    #[error("missing target parameter")]
    MissingTarget,

    /// The remote-exec plugin has no host to run on.
    #[error("missing destination parameter")]
    MissingDestination,

    /// The remote-exec plugin has nothing to run.
    #[error("missing command parameter")]
    MissingCommand,

    /// Both a password and a passphrase were supplied.
    ///
    /// `sshpass` only accepts a single secret, so there is no way to tell which one it should
    /// answer prompts with.
    #[error("can't use both password and passphrase for authentication")]
    AmbiguousAuth,

    /// A required binary was not found in any of the search locations.
    #[error("can't find {0} binary")]
    MissingTool(Tool),

    /// Failed to create the temporary file that holds a secret.
    #[error("couldn't create temporary file")]
    StageCreate(#[source] io::Error),

    /// Failed to write a secret into its temporary file.
    #[error("couldn't inject temporary file contents")]
    StageWrite(#[source] io::Error),

    /// Failed to restrict the permissions of a secret's temporary file.
    #[error("couldn't set file permissions")]
    StagePermissions(#[source] io::Error),

    /// The plugin configuration did not pass validation.
    #[error("plugin failed validation")]
    Validation(#[source] Box<Error>),

    /// The plugin configuration could not be set up.
    #[error("plugin failed setup")]
    Setup(#[source] Box<Error>),

    /// The plugin was asked to run with an execution style that does not exist.
    ///
    /// See [`ExecStyle`](crate::ExecStyle) for the available options.
    #[error("unknown exec style {0:?}, expected `syscall` or `subprocess`")]
    UnknownExecStyle(String),

    /// The binary to execute does not exist.
    #[error("missing binary: {}", .0.display())]
    MissingBinary(PathBuf),

    /// Executing the binary failed, or it exited unsuccessfully.
    #[error("execution error")]
    Exec(#[source] io::Error),
}

impl Error {
    /// Walk to the innermost cause of a [`Validation`](Error::Validation) or
    /// [`Setup`](Error::Setup) error.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Validation(inner) | Error::Setup(inner) => inner.root_cause(),
            e => e,
        }
    }
}

//! Run commands on a remote host with `ssh`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::auth::{self, Credentials, DEFAULT_SSH_FLAGS};
use super::fs::{Filesystem, OsFilesystem};
use super::locate::{locate, Tool, BIN_SEARCH_LOCATIONS};
use super::plugin::PluginConfig;
use super::{Error, Version};

/// Separates the commands so they run one after another in a single session, stopping at the
/// first one that fails.
pub const COMMAND_SEPARATOR: &str = " && ";

/// Configuration of the `ssh` plugin.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// The host to run on, as `[user@]hostname` or `ssh://[user@]hostname[:port]`. Required.
    pub destination: String,

    /// Commands to run on [`destination`](Self::destination), in order. Required.
    pub command: Vec<String>,

    /// Flags for `ssh`. When empty, [`DEFAULT_SSH_FLAGS`] are used instead.
    pub ssh_flags: Vec<String>,

    /// How to authenticate against the remote host.
    pub credentials: Credentials,

    /// Reported to the binary through its environment.
    pub version: Version,

    fs: Option<Arc<dyn Filesystem>>,
    ssh: PathBuf,
    sshpass: PathBuf,
}

impl Config {
    /// Use `fs` instead of the real filesystem during [`setup`](PluginConfig::setup).
    pub fn filesystem(&mut self, fs: Arc<dyn Filesystem>) -> &mut Self {
        self.fs = Some(fs);
        self
    }

    /// All commands as the single string handed to the remote shell.
    pub fn remote_command(&self) -> String {
        self.command.join(COMMAND_SEPARATOR)
    }
}

impl PluginConfig for Config {
    fn validate(&self) -> Result<(), Error> {
        if self.destination.is_empty() {
            return Err(Error::MissingDestination);
        }

        if self.command.is_empty() {
            return Err(Error::MissingCommand);
        }

        self.credentials.validate()
    }

    fn setup(&mut self) -> Result<(), Error> {
        let fs = Arc::clone(
            self.fs
                .get_or_insert_with(|| Arc::new(OsFilesystem) as Arc<dyn Filesystem>),
        );

        self.ssh = locate(&*fs, BIN_SEARCH_LOCATIONS, Tool::Ssh)?;
        self.sshpass = locate(&*fs, BIN_SEARCH_LOCATIONS, Tool::Sshpass)?;

        self.credentials.stage(&*fs)
    }

    fn binary(&self) -> &Path {
        if self.credentials.use_sshpass() {
            &self.sshpass
        } else {
            &self.ssh
        }
    }

    fn arguments(&self) -> Vec<String> {
        let mut args = self.credentials.command_prefix(&self.sshpass, &self.ssh);
        args.extend(auth::flags_or_default(&self.ssh_flags, DEFAULT_SSH_FLAGS));
        args.extend(self.credentials.identity_args());
        args.push(self.destination.clone());
        args.push(self.remote_command());
        args
    }

    fn environment(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "VELA_SSH_PLUGIN_VERSION".to_string(),
                self.version.plugin.clone(),
            ),
            (
                "VELA_SSH_PLUGIN_COMMIT".to_string(),
                self.version.commit.clone(),
            ),
        ])
    }
}

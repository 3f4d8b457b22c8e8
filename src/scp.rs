//! Copy files between local and remote file systems with `scp`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::auth::{self, Credentials, DEFAULT_SCP_FLAGS};
use super::fs::{Filesystem, OsFilesystem};
use super::locate::{locate, Tool, BIN_SEARCH_LOCATIONS};
use super::plugin::PluginConfig;
use super::{Error, Version};

/// Configuration of the `scp` plugin.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Files to copy, local or remote. Required.
    pub source: Vec<String>,

    /// Where the [`source`](Self::source) files end up, local or remote. Required.
    pub target: String,

    /// Flags for `scp`. When empty, [`DEFAULT_SCP_FLAGS`] are used instead.
    pub scp_flags: Vec<String>,

    /// How to authenticate against remote hosts.
    pub credentials: Credentials,

    /// Reported to the binary through its environment.
    pub version: Version,

    fs: Option<Arc<dyn Filesystem>>,
    scp: PathBuf,
    ssh: PathBuf,
    sshpass: PathBuf,
}

impl Config {
    /// Use `fs` instead of the real filesystem during [`setup`](PluginConfig::setup).
    pub fn filesystem(&mut self, fs: Arc<dyn Filesystem>) -> &mut Self {
        self.fs = Some(fs);
        self
    }
}

impl PluginConfig for Config {
    /// Only checks what the plugin itself needs. Whether the paths and flags make sense is left
    /// for `scp` to decide.
    fn validate(&self) -> Result<(), Error> {
        if self.source.is_empty() {
            return Err(Error::MissingSource);
        }

        if self.target.is_empty() {
            return Err(Error::MissingTarget);
        }

        self.credentials.validate()
    }

    fn setup(&mut self) -> Result<(), Error> {
        let fs = Arc::clone(
            self.fs
                .get_or_insert_with(|| Arc::new(OsFilesystem) as Arc<dyn Filesystem>),
        );

        self.scp = locate(&*fs, BIN_SEARCH_LOCATIONS, Tool::Scp)?;
        self.ssh = locate(&*fs, BIN_SEARCH_LOCATIONS, Tool::Ssh)?;
        self.sshpass = locate(&*fs, BIN_SEARCH_LOCATIONS, Tool::Sshpass)?;

        tracing::debug!(
            scp = %self.scp.display(),
            ssh = %self.ssh.display(),
            sshpass = %self.sshpass.display(),
            "located binaries"
        );

        self.credentials.stage(&*fs)
    }

    fn binary(&self) -> &Path {
        if self.credentials.use_sshpass() {
            &self.sshpass
        } else {
            &self.scp
        }
    }

    fn arguments(&self) -> Vec<String> {
        let mut args = self.credentials.command_prefix(&self.sshpass, &self.scp);
        args.extend(auth::flags_or_default(&self.scp_flags, DEFAULT_SCP_FLAGS));
        args.extend(self.credentials.identity_args());
        args.extend(self.source.iter().cloned());
        args.push(self.target.clone());
        args
    }

    fn environment(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "VELA_SCP_PLUGIN_VERSION".to_string(),
                self.version.plugin.clone(),
            ),
            (
                "VELA_SCP_PLUGIN_COMMIT".to_string(),
                self.version.commit.clone(),
            ),
        ])
    }
}

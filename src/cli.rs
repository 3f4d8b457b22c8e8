//! Plumbing shared by the `vela-scp` and `vela-ssh` binaries: where parameters come from, and
//! how the plugins log.
//!
//! Every parameter can be given, in order of precedence, as
//!
//! 1. a command line flag,
//! 2. one of several environment variables (the first one set wins),
//! 3. a file under `/vela/parameters/<plugin>/<name>`,
//! 4. a file under `/vela/secrets/<plugin>/<name>`.

use std::collections::HashMap;
use std::env;
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, FromArgMatches};
use tracing_subscriber::EnvFilter;

use super::auth::Credentials;
use super::{Error, ExecStyle, Version};

/// Where pipeline parameters are mounted.
pub const PARAMETERS_DIR: &str = "/vela/parameters";

/// Where pipeline secrets are mounted.
pub const SECRETS_DIR: &str = "/vela/secrets";

/// Fills in parameters that were not given as flags.
#[derive(Debug, Clone)]
pub struct Resolver {
    plugin: String,
    parameters: PathBuf,
    secrets: PathBuf,
    env: HashMap<String, String>,
}

impl Resolver {
    /// Resolve parameters of `plugin` (e.g. `vela-scp`) from the process environment and the
    /// standard mount points.
    pub fn new(plugin: &str) -> Self {
        Self::with_sources(plugin, PARAMETERS_DIR, SECRETS_DIR, env::vars())
    }

    /// Resolve parameters from the given directories and environment instead.
    pub fn with_sources<I>(
        plugin: &str,
        parameters: impl AsRef<Path>,
        secrets: impl AsRef<Path>,
        env: I,
    ) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            plugin: plugin.to_string(),
            parameters: parameters.as_ref().to_path_buf(),
            secrets: secrets.as_ref().to_path_buf(),
            env: env.into_iter().collect(),
        }
    }

    fn lookup(&self, envs: &[&str], name: &str) -> Option<Found> {
        if let Some(value) = envs
            .iter()
            .filter_map(|key| self.env.get(*key))
            .find(|value| !value.is_empty())
        {
            return Some(Found::Env(value.clone()));
        }

        [&self.parameters, &self.secrets]
            .iter()
            .map(|dir| dir.join(&self.plugin).join(name))
            .find_map(|path| fs::read_to_string(path).ok())
            .map(Found::File)
    }

    /// A single value. Values read from files are trimmed.
    pub fn string(&self, flag: Option<String>, envs: &[&str], name: &str) -> Option<String> {
        flag.or_else(|| {
            self.lookup(envs, name).map(|found| match found {
                Found::Env(value) => value,
                Found::File(value) => value.trim().to_string(),
            })
        })
        .filter(|value| !value.is_empty())
    }

    /// A single value taken exactly as given, for file contents where every byte matters.
    pub fn verbatim(&self, flag: Option<String>, envs: &[&str], name: &str) -> Option<String> {
        flag.or_else(|| self.lookup(envs, name).map(Found::into_inner))
            .filter(|value| !value.is_empty())
    }

    /// A list of values. Outside of flags, the list is given as comma-separated values.
    pub fn list(&self, flag: Vec<String>, envs: &[&str], name: &str) -> Vec<String> {
        if !flag.is_empty() {
            return flag;
        }

        self.lookup(envs, name)
            .map(|found| {
                found
                    .into_inner()
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a switch is turned on by its flag or any of its environment variables.
    pub fn is_set(&self, flag: Option<&str>, envs: &[&str]) -> bool {
        let given = |value: Option<&String>| value.map_or(false, |v| !v.is_empty());

        flag.map_or(false, |v| !v.is_empty()) || envs.iter().any(|key| given(self.env.get(*key)))
    }
}

/// Where a value that was not given as a flag came from.
#[derive(Debug)]
enum Found {
    Env(String),
    File(String),
}

impl Found {
    fn into_inner(self) -> String {
        match self {
            Found::Env(value) | Found::File(value) => value,
        }
    }
}

/// Flags both plugins share.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Path to an identity file (see manual 'man ssh')
    #[arg(long = "identity-file.path", value_delimiter = ',')]
    pub identity_file_path: Vec<String>,

    /// Contents of an identity file (not the path, the real deal)
    #[arg(long = "identity-file.contents")]
    pub identity_file_contents: Option<String>,

    /// Password for the remote host (used with sshpass)
    #[arg(long = "sshpass.password")]
    pub sshpass_password: Option<String>,

    /// Passphrase for the identity files (used with sshpass)
    #[arg(long = "sshpass.passphrase")]
    pub sshpass_passphrase: Option<String>,

    /// Any additional flags for sshpass
    #[arg(long = "sshpass.flag", value_delimiter = ',', allow_hyphen_values = true)]
    pub sshpass_flag: Vec<String>,

    /// Set the CI environment (if set, output tries to be friendlier to log viewers)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub ci: Option<String>,

    /// How to run the wrapped binary: `syscall` or `subprocess`
    #[arg(long = "exec-style")]
    pub exec_style: Option<String>,
}

impl CommonArgs {
    /// Whether the plugin runs in CI.
    pub fn ci(&self, resolver: &Resolver) -> bool {
        resolver.is_set(self.ci.as_deref(), &["PARAMETER_CI", "CI"])
    }

    /// How to run the wrapped binary.
    pub fn exec_style(&self, resolver: &Resolver) -> ExecStyle {
        resolver
            .string(
                self.exec_style.clone(),
                &["PARAMETER_EXEC_STYLE", "EXEC_STYLE"],
                "exec-style",
            )
            .map(|style| ExecStyle::from(style.as_str()))
            .unwrap_or_default()
    }

    /// The credentials described by these flags and their fallbacks.
    pub fn credentials(self, resolver: &Resolver) -> Credentials {
        Credentials {
            identity_file_paths: resolver.list(
                self.identity_file_path,
                &[
                    "PARAMETER_IDENTITY_FILE_PATH",
                    "IDENTITY_FILE_PATH",
                    "PARAMETER_SSH_KEY_PATH",
                    "SSH_KEY_PATH",
                ],
                "identity-file.path",
            ),
            identity_file_contents: resolver.verbatim(
                self.identity_file_contents,
                &[
                    "PARAMETER_IDENTITY_FILE_CONTENTS",
                    "IDENTITY_FILE_CONTENTS",
                    "PARAMETER_SSH_KEY",
                    "SSH_KEY",
                ],
                "identity-file.contents",
            ),
            password: resolver.string(
                self.sshpass_password,
                &[
                    "PARAMETER_SSHPASS_PASSWORD",
                    "PARAMETER_PASSWORD",
                    "SSHPASS_PASSWORD",
                    "PASSWORD",
                ],
                "sshpass.password",
            ),
            passphrase: resolver.string(
                self.sshpass_passphrase,
                &["PARAMETER_SSHPASS_PASSPHRASE", "SSHPASS_PASSPHRASE"],
                "sshpass.passphrase",
            ),
            sshpass_flags: resolver.list(
                self.sshpass_flag,
                &["PARAMETER_SSHPASS_FLAG", "SSHPASS_FLAG"],
                "sshpass.flag",
            ),
            ..Default::default()
        }
    }
}

/// Parse the command line, reporting `version` for `--version`.
pub fn parse<T: CommandFactory + FromArgMatches>(version: &Version) -> T {
    let matches = T::command().version(version.to_string()).get_matches();
    T::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

/// Install the global subscriber.
///
/// In CI the output goes to a log viewer, so it is plain and timestamped. Anywhere else it is
/// colored and left without timestamps. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(ci: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // a subscriber may already be installed, in which case it stays in charge
    let _ = if ci {
        builder.with_ansi(false).try_init()
    } else {
        builder.with_ansi(true).without_time().try_init()
    };
}

/// Log where the plugin comes from and what it was built with.
pub fn banner(plugin: &str, version: &Version) {
    if version.dirty {
        tracing::warn!("binary built from modified commit {}", version.commit);
    }

    let short = plugin.trim_start_matches("vela-");
    tracing::info!(
        code = "https://github.com/go-vela/vela-openssh",
        docs = %format!("https://go-vela.github.io/docs/plugins/registry/pipeline/{}", short),
        registry = %format!("https://hub.docker.com/r/target/{}", plugin),
        commit = %version.commit,
        version_plugin = %version.plugin,
        version_openssh = %version.openssh,
        version_sshpass = %version.sshpass,
        "Vela {} Plugin",
        short.to_uppercase()
    );
}

/// `err` followed by each of its causes, separated by `: `.
pub fn report(err: &Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

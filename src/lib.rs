//! Pipeline plugins wrapping the OpenSSH `scp` and `ssh` binaries.
//!
//! A pipeline step describes what it wants declaratively (files to copy, a host to run commands
//! on, credentials), and this crate turns that into a single invocation of `scp` or `ssh`. The
//! network side is left entirely to OpenSSH; all that happens here is assembling the command line
//! and handing over to it.
//!
//! Both plugins go through the same lifecycle, driven by [`Plugin`]:
//!
//! 1. [`validate`](PluginConfig::validate) the configuration, without touching the system;
//! 2. [`setup`](PluginConfig::setup): find the binaries and write secrets out to files;
//! 3. ask for the [`binary`](PluginConfig::binary), its
//!    [`arguments`](PluginConfig::arguments) and [`environment`](PluginConfig::environment);
//! 4. expand environment variable references in the arguments, and run the binary.
//!
//! # Authentication
//!
//! Identity files can be given as paths, or as their raw contents (which usually come from a
//! pipeline secret). Passwords and passphrases are supplied through [`sshpass`], which then wraps
//! the real binary:
//!
//! ```text
//! sshpass -f /tmp/vela-plugin-openssh-password-file-XXXX scp <flags> <sources> <target>
//! ```
//!
//! Secrets are only ever passed on through files readable by the current user alone, never on
//! the command line.
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), vela_openssh::Error> {
//! use vela_openssh::{ssh, ExecStyle, Plugin, Version};
//!
//! let mut config = ssh::Config::default();
//! config.destination = "me@ssh.example.com".to_string();
//! config.command = vec!["whoami".to_string(), "pwd".to_string()];
//! config.version = Version::from_build();
//!
//! let mut plugin = Plugin::new(config);
//! plugin.exec_style(ExecStyle::Subprocess);
//! plugin.exec().await?;
//! # Ok(()) }
//! ```
//!
//!   [`sshpass`]: https://sourceforge.net/projects/sshpass/

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

mod error;
pub use error::Error;

mod version;
pub use version::Version;

mod plugin;
pub use plugin::{expand_env, ExecStyle, Plugin, PluginConfig};

pub mod auth;
pub mod cli;
pub mod fs;
pub mod locate;
pub mod scp;
pub mod secret;
pub mod ssh;

/// Result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

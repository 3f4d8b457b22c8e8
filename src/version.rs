use std::fmt;

const UNKNOWN: &str = "unknown";

/// Build metadata reported by the plugins.
///
/// The plugins only use this for diagnostics: it ends up in the startup banner, in `--version`,
/// and in the environment handed to the wrapped binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Version of the plugin itself.
    pub plugin: String,
    /// Version of the bundled OpenSSH client.
    pub openssh: String,
    /// Version of the bundled `sshpass`.
    pub sshpass: String,
    /// Source control revision the plugin was built from.
    pub commit: String,
    /// Whether the checkout had uncommitted modifications.
    pub dirty: bool,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            plugin: UNKNOWN.to_string(),
            openssh: UNKNOWN.to_string(),
            sshpass: UNKNOWN.to_string(),
            commit: UNKNOWN.to_string(),
            dirty: false,
        }
    }
}

impl Version {
    /// Metadata baked in at compile time.
    ///
    /// The plugin version comes from the crate manifest. `OPENSSH_VERSION`, `SSHPASS_VERSION`,
    /// `GIT_COMMIT` and `GIT_DIRTY` are read from the build environment if the image build sets
    /// them.
    pub fn from_build() -> Self {
        Self {
            plugin: env!("CARGO_PKG_VERSION").to_string(),
            openssh: option_env!("OPENSSH_VERSION").unwrap_or(UNKNOWN).to_string(),
            sshpass: option_env!("SSHPASS_VERSION").unwrap_or(UNKNOWN).to_string(),
            commit: option_env!("GIT_COMMIT").unwrap_or(UNKNOWN).to_string(),
            dirty: matches!(option_env!("GIT_DIRTY"), Some("true") | Some("1")),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plugin: {} - OpenSSH: {} - SSHPass: {}",
            self.plugin, self.openssh, self.sshpass
        )
    }
}

#[test]
fn display() {
    let v = Version {
        plugin: "1.2.3".into(),
        openssh: "9.6p1".into(),
        sshpass: "1.10".into(),
        ..Default::default()
    };
    assert_eq!(v.to_string(), "Plugin: 1.2.3 - OpenSSH: 9.6p1 - SSHPass: 1.10");
    assert_eq!(Version::from_build().plugin, env!("CARGO_PKG_VERSION"));
}

//! The lifecycle shared by every plugin that hands over to a binary.

use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::io;
use std::path::Path;

use tokio::process;

use super::Error;

/// What a plugin has to provide so that [`Plugin`] can run it.
pub trait PluginConfig: fmt::Debug {
    /// Check that the configuration makes sense, before anything touches the system.
    fn validate(&self) -> Result<(), Error>;

    /// Put everything the binary needs in place, such as files holding secrets.
    fn setup(&mut self) -> Result<(), Error>;

    /// Absolute path of the binary that takes over once the plugin has been set up.
    ///
    /// This must not rely on environment variables like `$HOME`.
    fn binary(&self) -> &Path;

    /// The arguments for [`binary`](PluginConfig::binary).
    ///
    /// Environment variable references like `$HOME` are left as they are; they get expanded right
    /// before execution.
    fn arguments(&self) -> Vec<String>;

    /// Additional environment variables for the binary.
    fn environment(&self) -> HashMap<String, String>;
}

/// How the binary is run once the plugin is ready.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecStyle {
    /// Replace the current process with the binary.
    ///
    /// From then on the binary owns all output, and its exit status becomes the plugin's. Where
    /// the platform cannot replace a process, the binary is run as a child with inherited stdio
    /// instead.
    #[default]
    Syscall,

    /// Run the binary as a child process.
    ///
    /// Its output is captured, not streamed, and logged once it exits.
    Subprocess,

    /// A style nobody knows how to run. [`Plugin::exec`] rejects it.
    Unrecognized(String),
}

impl From<&str> for ExecStyle {
    fn from(style: &str) -> Self {
        match style.trim().to_ascii_lowercase().as_str() {
            "" | "syscall" | "exec" => ExecStyle::Syscall,
            "subprocess" | "command" => ExecStyle::Subprocess,
            _ => ExecStyle::Unrecognized(style.to_string()),
        }
    }
}

/// Runs a [`PluginConfig`] through validation, setup and execution.
#[derive(Debug, Default)]
pub struct Plugin {
    exec_style: ExecStyle,
    config: Option<Box<dyn PluginConfig>>,
}

impl Plugin {
    /// A plugin that runs `config` with the default [`ExecStyle`].
    pub fn new<C: PluginConfig + 'static>(config: C) -> Self {
        Self {
            exec_style: ExecStyle::default(),
            config: Some(Box::new(config)),
        }
    }

    /// See [`ExecStyle`].
    ///
    /// Default `ExecStyle::Syscall`.
    pub fn exec_style(&mut self, style: ExecStyle) -> &mut Self {
        self.exec_style = style;
        self
    }

    /// Validate, set up, and run the plugin.
    ///
    /// With [`ExecStyle::Syscall`] on unix this only returns if something went wrong; otherwise
    /// the binary has taken over the process.
    pub async fn exec(&mut self) -> Result<(), Error> {
        let config = self
            .config
            .as_mut()
            .ok_or_else(|| {
                Error::Exec(io::Error::new(io::ErrorKind::Other, "no plugin configured"))
            })?;

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "validation failed");
            return Err(Error::Validation(Box::new(e)));
        }

        if let Err(e) = config.setup() {
            tracing::error!(error = %e, "setup failed");
            return Err(Error::Setup(Box::new(e)));
        }

        let binary = config.binary().to_path_buf();
        let mut arguments = config.arguments();
        let environment = config.environment();

        // Log before expanding anything: the arguments may refer to variables holding secrets.
        tracing::info!(
            binary = %binary.display(),
            arguments = ?arguments,
            command = %shell_line(&arguments),
            "resolved plugin"
        );

        match self.exec_style {
            ExecStyle::Syscall | ExecStyle::Subprocess => {}
            ExecStyle::Unrecognized(ref style) => {
                return Err(Error::UnknownExecStyle(style.clone()));
            }
        }

        let program = binary.to_string_lossy();
        if arguments.first().map(String::as_str) != Some(&*program) {
            arguments.insert(0, program.into_owned());
        }

        for (key, value) in &environment {
            env::set_var(key, value);
        }

        let arguments: Vec<String> = arguments.iter().map(|arg| expand_env(arg)).collect();

        match self.exec_style {
            ExecStyle::Syscall => replace_process(&binary, &arguments).await,
            _ => run_subprocess(&binary, &arguments).await,
        }
    }
}

/// Expand `$VAR` and `${VAR}` from the process environment. Unset variables expand to nothing.
pub fn expand_env(arg: &str) -> String {
    shellexpand::env_with_context_no_errors(arg, |name| Some(env::var(name).unwrap_or_default()))
        .into_owned()
}

fn shell_line(arguments: &[String]) -> String {
    arguments
        .iter()
        .map(|arg| shell_escape::unix::escape(Cow::Borrowed(arg.as_str())))
        .collect::<Vec<_>>()
        .join(" ")
}

fn missing_or_exec(binary: &Path, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::MissingBinary(binary.to_path_buf())
    } else {
        Error::Exec(err)
    }
}

#[cfg(unix)]
async fn replace_process(binary: &Path, arguments: &[String]) -> Result<(), Error> {
    use std::os::unix::process::CommandExt;

    let (arg0, rest) = match arguments.split_first() {
        Some(split) => split,
        None => return Err(Error::MissingBinary(binary.to_path_buf())),
    };

    // exec only ever returns on failure
    let err = std::process::Command::new(binary)
        .arg0(arg0)
        .args(rest)
        .exec();

    Err(missing_or_exec(binary, err))
}

#[cfg(not(unix))]
async fn replace_process(binary: &Path, arguments: &[String]) -> Result<(), Error> {
    // No execve here, so the closest thing is a child that shares our stdio.
    let status = process::Command::new(binary)
        .args(arguments.iter().skip(1))
        .status()
        .await
        .map_err(|e| missing_or_exec(binary, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::Exec(io::Error::new(
            io::ErrorKind::Other,
            format!("{} exited with {}", binary.display(), status),
        )))
    }
}

async fn run_subprocess(binary: &Path, arguments: &[String]) -> Result<(), Error> {
    let output = process::Command::new(binary)
        .args(arguments.iter().skip(1))
        .output()
        .await
        .map_err(Error::Exec)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        if !stdout.is_empty() {
            tracing::info!("{}", stdout);
        }
        if !stderr.is_empty() {
            tracing::error!("{}", stderr);
        }

        return Err(Error::Exec(io::Error::new(
            io::ErrorKind::Other,
            format!("{} exited with {}", binary.display(), output.status),
        )));
    }

    if !stdout.is_empty() {
        tracing::info!("{}", stdout);
    }
    if !stderr.is_empty() {
        tracing::info!("{}", stderr);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_style_from_str() {
        assert_eq!(ExecStyle::from("syscall"), ExecStyle::Syscall);
        assert_eq!(ExecStyle::from(""), ExecStyle::Syscall);
        assert_eq!(ExecStyle::from("Subprocess"), ExecStyle::Subprocess);
        assert_eq!(
            ExecStyle::from("fork"),
            ExecStyle::Unrecognized("fork".to_string())
        );
    }

    #[test]
    fn expands_environment_references() {
        env::set_var("VELA_OPENSSH_EXPAND_TEST", "Howdy!");
        assert_eq!(expand_env("$VELA_OPENSSH_EXPAND_TEST"), "Howdy!");
        assert_eq!(expand_env("a-${VELA_OPENSSH_EXPAND_TEST}-b"), "a-Howdy!-b");
        assert_eq!(expand_env("$VELA_OPENSSH_EXPAND_UNSET_TEST/x"), "/x");
        assert_eq!(expand_env("user@host:~"), "user@host:~");
    }

    #[test]
    fn shell_line_quotes_when_needed() {
        let args = vec![
            "/usr/bin/ssh".to_string(),
            "-o StrictHostKeyChecking=no".to_string(),
            "whoami && pwd".to_string(),
        ];
        assert_eq!(
            shell_line(&args),
            "/usr/bin/ssh '-o StrictHostKeyChecking=no' 'whoami && pwd'"
        );
    }
}

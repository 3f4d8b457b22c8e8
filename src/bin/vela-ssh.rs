//! Vela plugin running commands on a remote host with `ssh`.

use clap::Parser;

use vela_openssh::cli::{self, CommonArgs, Resolver};
use vela_openssh::{ssh, Plugin, Version};

const PLUGIN: &str = "vela-ssh";

/// Run commands on a remote host with ssh
#[derive(Debug, Parser)]
#[command(name = PLUGIN)]
struct Args {
    /// Remote host to run the commands on, as [user@]hostname or ssh://[user@]hostname[:port]
    #[arg(long)]
    destination: Option<String>,

    /// Commands to run on the destination, in order
    #[arg(long, value_delimiter = ',')]
    command: Vec<String>,

    /// Any additional flags for ssh (replace the defaults)
    #[arg(long = "ssh.flag", value_delimiter = ',', allow_hyphen_values = true)]
    ssh_flag: Vec<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let version = Version::from_build();
    let args: Args = cli::parse(&version);
    let resolver = Resolver::new(PLUGIN);

    cli::init_logging(args.common.ci(&resolver));
    cli::banner(PLUGIN, &version);

    let exec_style = args.common.exec_style(&resolver);
    let mut config = ssh::Config::default();
    config.destination = resolver
        .string(
            args.destination,
            &["PARAMETER_DESTINATION", "DESTINATION", "PARAMETER_HOST"],
            "destination",
        )
        .unwrap_or_default();
    config.command = resolver.list(
        args.command,
        &["PARAMETER_COMMAND", "COMMAND", "PARAMETER_SCRIPT", "SCRIPT"],
        "command",
    );
    config.ssh_flags =
        resolver.list(args.ssh_flag, &["PARAMETER_SSH_FLAG", "SSH_FLAG"], "ssh.flag");
    config.credentials = args.common.credentials(&resolver);
    config.version = version;

    let mut plugin = Plugin::new(config);
    plugin.exec_style(exec_style);

    if let Err(err) = plugin.exec().await {
        tracing::error!("{}", cli::report(&err));
        std::process::exit(1);
    }
}

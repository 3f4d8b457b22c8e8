//! Vela plugin copying files with `scp`.

use clap::Parser;

use vela_openssh::cli::{self, CommonArgs, Resolver};
use vela_openssh::{scp, Plugin, Version};

const PLUGIN: &str = "vela-scp";

/// Copy files to and from remote hosts with scp
#[derive(Debug, Parser)]
#[command(name = PLUGIN)]
struct Args {
    /// Source files to copy from
    #[arg(long, value_delimiter = ',')]
    source: Vec<String>,

    /// Target path to copy to
    #[arg(long)]
    target: Option<String>,

    /// Any additional flags for scp (replace the defaults)
    #[arg(long = "scp.flag", value_delimiter = ',', allow_hyphen_values = true)]
    scp_flag: Vec<String>,

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
    let mut config = scp::Config::default();
    config.source = resolver.list(args.source, &["PARAMETER_SOURCE", "SOURCE"], "source");
    config.target = resolver
        .string(args.target, &["PARAMETER_TARGET", "TARGET"], "target")
        .unwrap_or_default();
    config.scp_flags =
        resolver.list(args.scp_flag, &["PARAMETER_SCP_FLAG", "SCP_FLAG"], "scp.flag");
    config.credentials = args.common.credentials(&resolver);
    config.version = version;

    let mut plugin = Plugin::new(config);
    plugin.exec_style(exec_style);

    if let Err(err) = plugin.exec().await {
        tracing::error!("{}", cli::report(&err));
        std::process::exit(1);
    }
}

//! replug — convert Claude Code plugin bundles for OpenCode and Codex.

mod install_commands;

use {
    clap::{Parser, Subcommand},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "replug",
    about = "Convert Claude Code plugin bundles for OpenCode and Codex",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a plugin and install it into one or more target roots.
    Install(install_commands::InstallArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let result = match cli.command {
        Commands::Install(args) => install_commands::run_install(args).await,
    };

    // Fatal conditions print one line and exit non-zero.
    if let Err(error) = result {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

use std::path::PathBuf;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::op::{Op, OpContext};
use cli::ops::{Events, Init, Version, Watch};

crate::command_enum! {
    (Init, Init),
    (Events, Events),
    (Watch, Watch),
    (Version, Version),
}

#[derive(Parser, Debug)]
#[command(name = "checkin", version, about = "Keep geofenced event locations in sync with a remote store")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// App directory (default: ~/.checkin)
    #[arg(long, global = true, env = "CHECKIN_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = OpContext::new(cli.config_path);
    match cli.command.execute(&ctx).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

mod app;
mod caption;
mod columnist;
mod config;
mod image;
mod logger;
mod models;
mod pipeline;
mod publisher;
mod sources;
mod sports;
mod utils;
mod window;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::models::Sport;

#[derive(Parser)]
#[command(name = "sportsfeed")]
#[command(about = "Posts a fresh, illustrated sports story to chat")]
struct Cli {
    /// Sport to post about; repeat to give a priority list (default: weighted random)
    #[arg(long = "sport", value_enum)]
    sports: Vec<Sport>,

    /// Repeat every N milliseconds instead of running once
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Use this config file instead of the XDG one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Skip the AI column and post the story summary instead
    #[arg(long)]
    no_ai: bool,

    /// Log the post instead of sending it (dry run)
    #[arg(long)]
    no_publish: bool,

    /// Show debug logs on the console
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run(app::RunOptions {
        sports: cli.sports,
        interval_ms: cli.interval,
        config_path: cli.config,
        no_ai: cli.no_ai,
        no_publish: cli.no_publish,
        verbose: cli.verbose,
    })
    .await
}

// Das Keyboard 5Q lighting driver CLI

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "dk5q=info,dk5q_keyboard=info,dk5q_transport=info";
const VERBOSE_FILTER: &str = "dk5q=debug,dk5q_keyboard=debug,dk5q_transport=debug";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.session_config();
    match cli.command {
        Commands::List => commands::list(config),
        Commands::Info => commands::info(config),
        Commands::Brightness { level } => commands::brightness(config, level),
        Commands::Color {
            layout,
            key,
            color,
            from,
            rate,
        } => commands::color(config, &layout, &key, color, from, rate),
        Commands::Keys { layout } => commands::keys(&layout),
    }
}

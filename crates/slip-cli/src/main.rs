mod cli;
mod commands;
mod config;
mod storage;

use std::io;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand};

/// Entry point: resolve paths, open the store, run one command.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let paths = config::resolve_paths(cli.key_path, cli.store_file)?;

    match cli.command {
        Command::Config(ConfigCommand::Init) => init_config(&paths)?,
        Command::Config(ConfigCommand::Show) => show_paths(&paths),
        command => {
            let action = commands::Action::from_command(command, cli.tag)?;
            let mut store = storage::open_store(&paths)?;
            let mut out = io::stdout().lock();
            commands::execute(&mut store, action, &mut out)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    // Stdout carries secret values, so logs go to stderr and default to warnings only.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn init_config(paths: &config::StorePaths) -> Result<()> {
    let initial = config::Config {
        key_path: Some(paths.key_path.clone()),
        store_file: Some(paths.store_file.clone()),
    };
    let path = config::write_if_missing(&initial, &config::default_path()?)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

fn show_paths(paths: &config::StorePaths) {
    println!("key:   {}", paths.key_path.display());
    println!("store: {}", paths.store_file.display());
}

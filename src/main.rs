mod api;
mod app;
mod cli;
mod commands;
mod config;
mod model;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::Cli::parse();
    let config = config::load(args.api_base)?;
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::List { json } => commands::list(config, json),
        cli::Command::Add { title, content } => commands::add(config, title, content),
        cli::Command::Edit { id, title, content } => commands::edit(config, id, title, content),
        cli::Command::Delete { id, yes } => commands::delete(config, id, yes),
        cli::Command::Tui => commands::tui(config),
    }
}

mod announcement;
mod cli;
mod commands;
mod model;
mod parser;
mod programmes;
mod projector;
mod settings;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Display);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::Load { file } => commands::load(file),
        cli::Command::Add {
            title,
            duration,
            start,
        } => commands::add(title, duration, start),
        cli::Command::Next => commands::next(),
        cli::Command::End => commands::end(),
        cli::Command::Pause => commands::pause(),
        cli::Command::Restart { position } => commands::restart(position),
        cli::Command::Skip { position } => commands::skip(position),
        cli::Command::Edit {
            title,
            start,
            duration,
        } => commands::edit(title, start, duration),
        cli::Command::Clear => commands::clear(),
        cli::Command::Status => commands::status(),
        cli::Command::Export => commands::export(),
        cli::Command::Programmes => commands::programmes(),
        cli::Command::Save { name } => commands::save(name),
        cli::Command::Open { name } => commands::open(name),
        cli::Command::Delete { name } => commands::delete(name),
        cli::Command::Announce {
            text,
            minutes,
            clear,
        } => commands::announce(text, minutes, clear),
        cli::Command::Prefs { always_fullscreen } => commands::prefs(always_fullscreen),
        cli::Command::Control => commands::tui(ui::Role::Control),
        cli::Command::Display => commands::tui(ui::Role::Display),
    }
}

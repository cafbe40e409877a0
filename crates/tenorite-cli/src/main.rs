//! Tenorite command-line interface

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "tenorite", version, about = "The Tenorite language", disable_help_subcommand = true)]
struct Cli {
    /// Input source file
    #[arg(short = 'i', long = "input")]
    input: String,

    /// Print diagnostics as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = commands::run::run(&cli.input, cli.json) {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}
